//! Generic request/response shapes for host-framework adapters.
//!
//! The router accepts an [`HttpRequest`] and returns an [`HttpResponse`];
//! translating those to a concrete framework's native types is the
//! adapter's job and stays outside this workspace.

use std::collections::BTreeMap;

use crate::errors::UploadError;

/// Framework-agnostic view of an incoming request.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_query<K, V>(mut self, name: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Serialize `body` as the request payload.
    ///
    /// # Panics
    ///
    /// Panics if `body` cannot be serialized; the wire types passed here
    /// always can, so a failure is a caller bug, not a runtime condition
    /// to map into a misleading empty-body `Protocol` error.
    pub fn with_json_body<T: serde::Serialize>(mut self, body: &T) -> Self {
        self.body = serde_json::to_vec(body).expect("request body must serialize to JSON");
        self
    }

    /// Header lookup, case-insensitive on the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(|v| v.as_str())
    }

    pub fn json_body<T: serde::de::DeserializeOwned>(&self) -> Result<T, UploadError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| UploadError::protocol(format!("Malformed request body: {e}")))
    }
}

/// Framework-agnostic response: a status and a JSON body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl HttpResponse {
    pub fn ok<T: serde::Serialize>(body: &T) -> Self {
        Self {
            status: 200,
            body: serde_json::to_value(body).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn from_error(err: &UploadError) -> Self {
        Self {
            status: err.status_code(),
            body: serde_json::json!({
                "error": err.to_detail(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_are_case_insensitive() {
        let req = HttpRequest::new().with_header("X-Request-Id", "abc");
        assert_eq!(req.header("x-request-id"), Some("abc"));
        assert_eq!(req.header("X-REQUEST-ID"), Some("abc"));
    }

    #[test]
    fn malformed_body_is_a_protocol_error() {
        let req = HttpRequest::new();
        let err = req
            .json_body::<crate::wire::AuthorizeRequest>()
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn error_responses_carry_machine_codes() {
        let res = HttpResponse::from_error(&UploadError::route_not_found("avatars"));
        assert_eq!(res.status, 404);
        assert_eq!(res.body["error"]["code"], "route_not_found");
    }
}
