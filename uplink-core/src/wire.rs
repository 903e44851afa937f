//! Wire contract between the server router and the client orchestrator.
//!
//! The client depends only on these shapes, never on router internals.
//! Field names are camelCased on the wire because the protocol is consumed
//! by browser clients.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::{ErrorDetail, UploadError};

/// File metadata sent during authorization. Never carries bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

impl FileDescriptor {
    pub fn new<N, M>(name: N, size: u64, mime_type: M) -> Self
    where
        N: Into<String>,
        M: Into<String>,
    {
        Self {
            name: name.into(),
            size,
            mime_type: mime_type.into(),
        }
    }

    /// Lower-cased filename extension, without the dot.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.name.rsplit_once('.')?;
        if ext.is_empty() {
            None
        } else {
            Some(ext.to_ascii_lowercase())
        }
    }
}

/// A single-purpose, time-boxed permission to PUT exactly one object.
///
/// Only the signed URL and the key cross to the client; credentials never do.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationGrant {
    pub object_key: String,
    pub signed_url: String,
    /// Unix seconds after which the grant is no longer valid.
    pub expires_at: i64,
    pub metadata: serde_json::Value,
}

/// Which batch operation a request is asking for. Travels out-of-band as a
/// query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadAction {
    Authorize,
    Complete,
}

impl UploadAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadAction::Authorize => "authorize",
            UploadAction::Complete => "complete",
        }
    }
}

impl FromStr for UploadAction {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorize" => Ok(UploadAction::Authorize),
            "complete" => Ok(UploadAction::Complete),
            other => Err(UploadError::protocol(format!(
                "Unknown upload action: '{other}'"
            ))),
        }
    }
}

/// Request body for the authorize operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizeRequest {
    pub files: Vec<FileDescriptor>,
}

/// Per-file authorize result. One entry per input file, same order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl AuthorizeOutcome {
    pub fn granted(grant: AuthorizationGrant) -> Self {
        Self {
            success: true,
            signed_url: Some(grant.signed_url),
            object_key: Some(grant.object_key),
            metadata: Some(grant.metadata),
            error: None,
        }
    }

    pub fn rejected(err: &UploadError) -> Self {
        Self {
            success: false,
            signed_url: None,
            object_key: None,
            metadata: None,
            error: Some(err.to_detail()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizeResponse {
    pub results: Vec<AuthorizeOutcome>,
}

/// One confirmed direct transfer, reported back after the PUT succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEntry {
    pub object_key: String,
    pub file: FileDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Request body for the complete operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteRequest {
    pub completions: Vec<CompletionEntry>,
}

/// Per-entry complete result. One entry per completion, same order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl CompleteOutcome {
    pub fn confirmed<U, K>(url: U, object_key: K) -> Self
    where
        U: Into<String>,
        K: Into<String>,
    {
        Self {
            success: true,
            url: Some(url.into()),
            object_key: Some(object_key.into()),
            error: None,
        }
    }

    pub fn rejected<K: Into<String>>(object_key: K, err: &UploadError) -> Self {
        Self {
            success: false,
            url: None,
            object_key: Some(object_key.into()),
            error: Some(err.to_detail()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteResponse {
    pub results: Vec<CompleteOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_extension_is_lowercased() {
        let d = FileDescriptor::new("Report.Final.PDF", 10, "application/pdf");
        assert_eq!(d.extension().as_deref(), Some("pdf"));
        assert_eq!(
            FileDescriptor::new("no-extension", 1, "text/plain").extension(),
            None
        );
        assert_eq!(
            FileDescriptor::new("trailing.", 1, "text/plain").extension(),
            None
        );
    }

    #[test]
    fn wire_fields_are_camel_cased() {
        let d = FileDescriptor::new("a.png", 42, "image/png");
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["mimeType"], "image/png");

        let outcome = AuthorizeOutcome::granted(AuthorizationGrant {
            object_key: "k".into(),
            signed_url: "https://example/put".into(),
            expires_at: 0,
            metadata: serde_json::Value::Null,
        });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["signedUrl"], "https://example/put");
        assert_eq!(json["objectKey"], "k");
    }

    #[test]
    fn unknown_action_is_a_protocol_error() {
        assert!("authorize".parse::<UploadAction>().is_ok());
        let err = "delete".parse::<UploadAction>().unwrap_err();
        assert_eq!(err.error_code(), "protocol_error");
    }
}
