use thiserror::Error;

/// Stable machine-readable issue codes.
pub mod codes {
    pub const TOO_LARGE: &str = "too_large";
    pub const TOO_SMALL: &str = "too_small";
    pub const INVALID_TYPE: &str = "invalid_type";
    pub const INVALID_EXTENSION: &str = "invalid_extension";
    pub const TOO_MANY_ITEMS: &str = "too_many_items";
    pub const TOO_FEW_ITEMS: &str = "too_few_items";
    pub const INVALID_VALUE: &str = "invalid_value";
    pub const MISSING: &str = "missing";
    pub const CUSTOM: &str = "custom";
}

/// A single validation failure: what went wrong, where.
///
/// `path` is empty at the root; array elements are addressed `[i]` and
/// object fields `.field` (leading dot dropped at the root).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SchemaIssue {
    pub code: String,
    pub message: String,
    pub path: String,
}

impl SchemaIssue {
    pub fn new<C, M, P>(code: C, message: M, path: P) -> Self
    where
        C: Into<String>,
        M: Into<String>,
        P: Into<String>,
    {
        Self {
            code: code.into(),
            message: message.into(),
            path: path.into(),
        }
    }

    pub fn missing(path: &str) -> Self {
        Self::new(codes::MISSING, "Value is required but was not provided", path)
    }

    pub fn custom<M: Into<String>>(path: &str, message: M) -> Self {
        Self::new(codes::CUSTOM, message, path)
    }
}

pub(crate) fn join_field(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

pub(crate) fn join_index(prefix: &str, idx: usize) -> String {
    format!("{prefix}[{idx}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_compose_like_accessors() {
        assert_eq!(join_field("", "avatar"), "avatar");
        assert_eq!(join_field("profile", "avatar"), "profile.avatar");
        assert_eq!(join_index("attachments", 2), "attachments[2]");
        assert_eq!(join_field(&join_index("", 0), "cover"), "[0].cover");
    }
}
