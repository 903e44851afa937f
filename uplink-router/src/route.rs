//! Routes: one schema, an ordered middleware chain, optional lifecycle hooks.

use std::sync::Arc;

use async_trait::async_trait;
use uplink_core::{FileDescriptor, HttpRequest, UploadError};
use uplink_schema::Schema;

/// Metadata accumulated across the middleware chain and attached to grants.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// One step of a route's middleware chain.
///
/// The chain is a left fold: step *k* receives the metadata returned by
/// step *k−1* and returns the metadata seen by step *k+1*. An error aborts
/// only the current file's authorization, never the batch.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn call(
        &self,
        file: &FileDescriptor,
        request: &HttpRequest,
        metadata: Metadata,
    ) -> anyhow::Result<Metadata>;
}

struct FnMiddleware<F>(F);

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&FileDescriptor, &HttpRequest, Metadata) -> anyhow::Result<Metadata> + Send + Sync,
{
    async fn call(
        &self,
        file: &FileDescriptor,
        request: &HttpRequest,
        metadata: Metadata,
    ) -> anyhow::Result<Metadata> {
        (self.0)(file, request, metadata)
    }
}

/// Wrap a plain closure as a [`Middleware`].
pub fn middleware_fn<F>(f: F) -> Arc<dyn Middleware>
where
    F: Fn(&FileDescriptor, &HttpRequest, Metadata) -> anyhow::Result<Metadata>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnMiddleware(f))
}

/// Fired before a grant is issued.
#[derive(Debug, Clone)]
pub struct UploadStarted {
    pub route: String,
    pub file: FileDescriptor,
    pub metadata: Metadata,
}

/// Fired after the client confirms a successful direct transfer.
#[derive(Debug, Clone)]
pub struct UploadCompleted {
    pub route: String,
    pub file: FileDescriptor,
    pub object_key: String,
    pub url: String,
    pub metadata: Metadata,
}

/// Fired on any per-file failure: validation, middleware, or completion.
#[derive(Debug)]
pub struct UploadFailure<'a> {
    pub route: String,
    pub file: Option<&'a FileDescriptor>,
    pub error: &'a UploadError,
}

/// Lifecycle hooks for a route. All methods default to no-ops.
///
/// Hook errors are caught and logged by the router; they never abort
/// processing of sibling files and never downgrade a successful result.
#[async_trait]
pub trait RouteHooks: Send + Sync {
    async fn on_start(&self, _event: &UploadStarted) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_complete(&self, _event: &UploadCompleted) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_error(&self, _event: &UploadFailure<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A named upload endpoint: schema + middleware + hooks.
///
/// Built explicitly from a schema via [`Route::builder`]; a schema never
/// silently becomes a route.
pub struct Route {
    pub(crate) schema: Schema,
    pub(crate) middleware: Vec<Arc<dyn Middleware>>,
    pub(crate) hooks: Option<Arc<dyn RouteHooks>>,
}

impl Route {
    pub fn builder(schema: Schema) -> RouteBuilder {
        RouteBuilder {
            schema,
            middleware: Vec::new(),
            hooks: None,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Run the middleware chain for one file.
    pub(crate) async fn fold_middleware(
        &self,
        file: &FileDescriptor,
        request: &HttpRequest,
    ) -> Result<Metadata, UploadError> {
        let mut metadata = Metadata::new();
        for step in &self.middleware {
            metadata = step
                .call(file, request, metadata)
                .await
                .map_err(UploadError::normalize)?;
        }
        Ok(metadata)
    }
}

/// Explicit two-step construction: build the schema, then wrap it.
pub struct RouteBuilder {
    schema: Schema,
    middleware: Vec<Arc<dyn Middleware>>,
    hooks: Option<Arc<dyn RouteHooks>>,
}

impl RouteBuilder {
    /// Append a middleware step to the end of the chain.
    pub fn middleware(mut self, step: Arc<dyn Middleware>) -> Self {
        self.middleware.push(step);
        self
    }

    /// Append a closure middleware step.
    pub fn middleware_fn<F>(self, f: F) -> Self
    where
        F: Fn(&FileDescriptor, &HttpRequest, Metadata) -> anyhow::Result<Metadata>
            + Send
            + Sync
            + 'static,
    {
        self.middleware(middleware_fn(f))
    }

    pub fn hooks(mut self, hooks: Arc<dyn RouteHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn build(self) -> Route {
        Route {
            schema: self.schema,
            middleware: self.middleware,
            hooks: self.hooks,
        }
    }
}
