//! The name → route registry and its two batch operations.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use uplink_core::{
    AuthorizationGrant, AuthorizeOutcome, AuthorizeRequest, AuthorizeResponse, CompleteOutcome,
    CompleteRequest, CompleteResponse, CompletionEntry, FileDescriptor, HttpRequest, HttpResponse,
    UploadAction, UploadConfig, UploadError, UploadResult,
};

use crate::keys::ObjectKeyPolicy;
use crate::route::{Metadata, Route, UploadCompleted, UploadFailure, UploadStarted};
use crate::store::ObjectStore;

/// A registry of named upload routes bound to one object store.
///
/// Stateless per call: all per-file work for one authorize/complete call
/// finishes before the handler returns. Configuration is injected, so a
/// process can hold several independent routers.
pub struct Router {
    routes: HashMap<String, Route>,
    store: Arc<dyn ObjectStore>,
    config: UploadConfig,
    keys: ObjectKeyPolicy,
}

impl Router {
    pub fn new(store: Arc<dyn ObjectStore>, config: UploadConfig) -> Self {
        let keys = ObjectKeyPolicy::from_config(&config);
        Self {
            routes: HashMap::new(),
            store,
            config,
            keys,
        }
    }

    /// Register a route under a given name. Names are unique; a later
    /// registration replaces an earlier one.
    pub fn route<S: Into<String>>(mut self, name: S, route: Route) -> Self {
        self.routes.insert(name.into(), route);
        self
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Dispatch a generic request on its out-of-band `route` and `action`
    /// query parameters.
    pub async fn handle(&self, request: &HttpRequest) -> HttpResponse {
        match self.dispatch(request).await {
            Ok(body) => HttpResponse { status: 200, body },
            Err(err) => {
                warn!(code = err.error_code(), "upload request failed: {err}");
                HttpResponse::from_error(&err)
            }
        }
    }

    async fn dispatch(&self, request: &HttpRequest) -> UploadResult<serde_json::Value> {
        let route_name = request
            .query_param("route")
            .ok_or_else(|| UploadError::protocol("Missing 'route' query parameter"))?
            .to_string();
        let action: UploadAction = request
            .query_param("action")
            .ok_or_else(|| UploadError::protocol("Missing 'action' query parameter"))?
            .parse()?;

        let body = match action {
            UploadAction::Authorize => {
                let body: AuthorizeRequest = request.json_body()?;
                let results = self.authorize(&route_name, request, &body.files).await?;
                serde_json::to_value(AuthorizeResponse { results })
            }
            UploadAction::Complete => {
                let body: CompleteRequest = request.json_body()?;
                let results = self
                    .complete(&route_name, request, &body.completions)
                    .await?;
                serde_json::to_value(CompleteResponse { results })
            }
        };

        body.map_err(|e| UploadError::protocol(format!("Failed to encode response: {e}")))
    }

    /// Authorize a batch of files against a named route.
    ///
    /// Partial-failure semantics: each file gets its own outcome and one
    /// file's failure never affects a sibling's. Only configuration
    /// problems abort the whole call.
    pub async fn authorize(
        &self,
        route_name: &str,
        request: &HttpRequest,
        files: &[FileDescriptor],
    ) -> UploadResult<Vec<AuthorizeOutcome>> {
        let route = self.lookup(route_name)?;
        let validations = route.schema().validate_files(files);

        let mut outcomes = Vec::with_capacity(files.len());
        for (file, validated) in files.iter().zip(validations) {
            outcomes.push(
                self.authorize_one(route_name, route, request, file, validated)
                    .await?,
            );
        }
        Ok(outcomes)
    }

    async fn authorize_one(
        &self,
        route_name: &str,
        route: &Route,
        request: &HttpRequest,
        file: &FileDescriptor,
        validated: Result<(), uplink_schema::SchemaIssue>,
    ) -> UploadResult<AuthorizeOutcome> {
        if let Err(issue) = validated {
            let err = UploadError::validation(issue.code, issue.message, issue.path);
            self.fire_error(route_name, route, Some(file), &err).await;
            return Ok(AuthorizeOutcome::rejected(&err));
        }

        let metadata = match route.fold_middleware(file, request).await {
            Ok(metadata) => metadata,
            Err(err @ UploadError::Configuration { .. }) => return Err(err),
            Err(err) => {
                self.fire_error(route_name, route, Some(file), &err).await;
                return Ok(AuthorizeOutcome::rejected(&err));
            }
        };

        self.fire_start(route_name, route, file, &metadata).await;

        let now = Utc::now().timestamp();
        let key = self.keys.object_key(route_name, &metadata, file, now);

        match self
            .store
            .sign_put(&key, &file.mime_type, file.size, self.config.url_expiry_secs)
            .await
        {
            Ok(signed) => {
                debug!(route = route_name, key = %signed.key, "issued upload grant");
                Ok(AuthorizeOutcome::granted(AuthorizationGrant {
                    object_key: signed.key,
                    signed_url: signed.url,
                    expires_at: now + self.config.url_expiry_secs as i64,
                    metadata: serde_json::Value::Object(metadata),
                }))
            }
            // Missing credentials/bucket is fatal for the whole batch.
            Err(err @ UploadError::Configuration { .. }) => Err(err),
            Err(err) => {
                self.fire_error(route_name, route, Some(file), &err).await;
                Ok(AuthorizeOutcome::rejected(&err))
            }
        }
    }

    /// Confirm a batch of finished direct transfers.
    pub async fn complete(
        &self,
        route_name: &str,
        _request: &HttpRequest,
        completions: &[CompletionEntry],
    ) -> UploadResult<Vec<CompleteOutcome>> {
        let route = self.lookup(route_name)?;

        let mut outcomes = Vec::with_capacity(completions.len());
        for entry in completions {
            outcomes.push(self.complete_one(route_name, route, entry).await?);
        }
        Ok(outcomes)
    }

    async fn complete_one(
        &self,
        route_name: &str,
        route: &Route,
        entry: &CompletionEntry,
    ) -> UploadResult<CompleteOutcome> {
        match self.store.exists(&entry.object_key).await {
            Ok(true) => {}
            Ok(false) => {
                let err = UploadError::transfer(format!(
                    "No object was uploaded at key '{}'",
                    entry.object_key
                ));
                self.fire_error(route_name, route, Some(&entry.file), &err)
                    .await;
                return Ok(CompleteOutcome::rejected(&entry.object_key, &err));
            }
            Err(err @ UploadError::Configuration { .. }) => return Err(err),
            Err(err) => {
                self.fire_error(route_name, route, Some(&entry.file), &err)
                    .await;
                return Ok(CompleteOutcome::rejected(&entry.object_key, &err));
            }
        }

        let url = self.store.public_url(&entry.object_key);

        if let Some(hooks) = &route.hooks {
            let event = UploadCompleted {
                route: route_name.to_string(),
                file: entry.file.clone(),
                object_key: entry.object_key.clone(),
                url: url.clone(),
                metadata: entry
                    .metadata
                    .as_ref()
                    .and_then(|v| v.as_object().cloned())
                    .unwrap_or_default(),
            };
            if let Err(e) = hooks.on_complete(&event).await {
                warn!(route = route_name, key = %entry.object_key, "on_complete hook failed: {e}");
            }
        }

        debug!(route = route_name, key = %entry.object_key, "upload confirmed");
        Ok(CompleteOutcome::confirmed(url, entry.object_key.clone()))
    }

    fn lookup(&self, route_name: &str) -> UploadResult<&Route> {
        self.routes
            .get(route_name)
            .ok_or_else(|| UploadError::route_not_found(route_name))
    }

    async fn fire_start(
        &self,
        route_name: &str,
        route: &Route,
        file: &FileDescriptor,
        metadata: &Metadata,
    ) {
        if let Some(hooks) = &route.hooks {
            let event = UploadStarted {
                route: route_name.to_string(),
                file: file.clone(),
                metadata: metadata.clone(),
            };
            if let Err(e) = hooks.on_start(&event).await {
                warn!(route = route_name, file = %file.name, "on_start hook failed: {e}");
            }
        }
    }

    async fn fire_error(
        &self,
        route_name: &str,
        route: &Route,
        file: Option<&FileDescriptor>,
        error: &UploadError,
    ) {
        if let Some(hooks) = &route.hooks {
            let event = UploadFailure {
                route: route_name.to_string(),
                file,
                error,
            };
            if let Err(e) = hooks.on_error(&event).await {
                warn!(route = route_name, "on_error hook failed: {e}");
            }
        }
    }
}
