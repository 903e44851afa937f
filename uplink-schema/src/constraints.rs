use serde::{Deserialize, Serialize};
use uplink_core::FileDescriptor;

use crate::issue::{codes, SchemaIssue};
use crate::size::SizeSpec;

/// Constraint payload for file-like kinds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConstraints {
    pub min_size: Option<SizeSpec>,
    pub max_size: Option<SizeSpec>,
    /// Accepted MIME patterns: exact (`image/png`) or suffix wildcard
    /// (`image/*`).
    pub accept: Vec<String>,
    /// Case-insensitive extension allow-list, stored without dots.
    pub extensions: Vec<String>,
}

impl FileConstraints {
    /// Check a descriptor against the constraints. `implied_accept` is the
    /// fallback pattern set when no explicit accept list was configured
    /// (image schemas imply `image/*`).
    pub(crate) fn check(
        &self,
        descriptor: &FileDescriptor,
        path: &str,
        implied_accept: &[&str],
    ) -> Result<(), SchemaIssue> {
        if let Some(spec) = &self.min_size {
            let min = resolve(spec, path)?;
            if descriptor.size < min {
                return Err(SchemaIssue::new(
                    codes::TOO_SMALL,
                    format!("File is {} bytes, minimum is {min}", descriptor.size),
                    path,
                ));
            }
        }

        if let Some(spec) = &self.max_size {
            let max = resolve(spec, path)?;
            // Inclusive bound: a file exactly at max passes.
            if descriptor.size > max {
                return Err(SchemaIssue::new(
                    codes::TOO_LARGE,
                    format!("File is {} bytes, maximum is {max}", descriptor.size),
                    path,
                ));
            }
        }

        let patterns: Vec<&str> = if self.accept.is_empty() {
            implied_accept.to_vec()
        } else {
            self.accept.iter().map(|s| s.as_str()).collect()
        };
        if !patterns.is_empty()
            && !patterns.iter().any(|p| mime_matches(p, &descriptor.mime_type))
        {
            return Err(SchemaIssue::new(
                codes::INVALID_TYPE,
                format!(
                    "Type '{}' is not accepted (expected one of: {})",
                    descriptor.mime_type,
                    patterns.join(", ")
                ),
                path,
            ));
        }

        if !self.extensions.is_empty() {
            let ext = descriptor.extension().unwrap_or_default();
            let allowed = self
                .extensions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(&ext));
            if !allowed {
                return Err(SchemaIssue::new(
                    codes::INVALID_EXTENSION,
                    format!(
                        "Extension '{ext}' is not allowed (expected one of: {})",
                        self.extensions.join(", ")
                    ),
                    path,
                ));
            }
        }

        Ok(())
    }
}

fn resolve(spec: &SizeSpec, path: &str) -> Result<u64, SchemaIssue> {
    spec.resolve().map_err(|e| {
        SchemaIssue::new(codes::INVALID_VALUE, format!("Bad size constraint: {e}"), path)
    })
}

/// Exact match, or suffix-wildcard match (`image/*` matches `image/png`).
pub(crate) fn mime_matches(pattern: &str, mime_type: &str) -> bool {
    if pattern == "*/*" || pattern == "*" {
        return true;
    }
    match pattern.strip_suffix("/*") {
        Some(prefix) => mime_type
            .split('/')
            .next()
            .is_some_and(|main| main.eq_ignore_ascii_case(prefix)),
        None => pattern.eq_ignore_ascii_case(mime_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_within_its_family_only() {
        assert!(mime_matches("image/*", "image/png"));
        assert!(mime_matches("image/*", "image/jpeg"));
        assert!(!mime_matches("image/*", "application/pdf"));
        assert!(mime_matches("application/pdf", "application/pdf"));
        assert!(!mime_matches("application/pdf", "application/json"));
        assert!(mime_matches("*/*", "video/mp4"));
    }

    #[test]
    fn max_size_boundary_is_inclusive() {
        let c = FileConstraints {
            max_size: Some(SizeSpec::from("1KB")),
            ..Default::default()
        };
        let at_limit = FileDescriptor::new("a.bin", 1024, "application/octet-stream");
        let over = FileDescriptor::new("b.bin", 1025, "application/octet-stream");

        assert!(c.check(&at_limit, "", &[]).is_ok());
        let issue = c.check(&over, "", &[]).unwrap_err();
        assert_eq!(issue.code, codes::TOO_LARGE);
    }

    #[test]
    fn extensions_match_case_insensitively() {
        let c = FileConstraints {
            extensions: vec!["png".into(), "jpg".into()],
            ..Default::default()
        };
        let upper = FileDescriptor::new("photo.PNG", 1, "image/png");
        let bad = FileDescriptor::new("doc.pdf", 1, "application/pdf");

        assert!(c.check(&upper, "", &[]).is_ok());
        assert_eq!(
            c.check(&bad, "", &[]).unwrap_err().code,
            codes::INVALID_EXTENSION
        );
    }

    #[test]
    fn unparsable_size_spec_surfaces_as_invalid_value() {
        let c = FileConstraints {
            max_size: Some(SizeSpec::from("10ZB")),
            ..Default::default()
        };
        let d = FileDescriptor::new("a.bin", 1, "application/octet-stream");
        assert_eq!(c.check(&d, "", &[]).unwrap_err().code, codes::INVALID_VALUE);
    }
}
