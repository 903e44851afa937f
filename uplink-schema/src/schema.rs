use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::constraints::FileConstraints;
use crate::issue::{codes, join_field, join_index, SchemaIssue};
use crate::size::SizeSpec;
use crate::value::{FileValue, RefineContext};

/// Custom validation rule, run after the kind-specific constraint check.
pub type Refinement = Arc<dyn Fn(&FileValue, &RefineContext) -> anyhow::Result<()> + Send + Sync>;

/// Value rewrite applied after all checks pass.
pub type Transform = Arc<dyn Fn(FileValue) -> FileValue + Send + Sync>;

/// Kind-specific constraint payloads, dispatched by one validator.
#[derive(Clone)]
pub enum Kind {
    File(FileConstraints),
    /// File with image semantics: when no accept list is configured,
    /// `image/*` is implied.
    Image(FileConstraints),
    Array {
        item: Box<Schema>,
        min_items: Option<usize>,
        max_items: Option<usize>,
        exact_items: Option<usize>,
    },
    Object(BTreeMap<String, Schema>),
}

/// An immutable, shareable validation schema.
///
/// Chain calls clone into a new value; a schema handed to several routes is
/// never mutated underneath them.
#[derive(Clone)]
pub struct Schema {
    kind: Kind,
    refinements: Vec<Refinement>,
    transforms: Vec<Transform>,
    optional: bool,
}

/// A schema accepting a single file.
pub fn file() -> Schema {
    Schema::new(Kind::File(FileConstraints::default()))
}

/// A schema accepting a single image file (`image/*` unless overridden).
pub fn image() -> Schema {
    Schema::new(Kind::Image(FileConstraints::default()))
}

/// A schema accepting a list of values, each validated by `item`.
pub fn array_of(item: Schema) -> Schema {
    Schema::new(Kind::Array {
        item: Box::new(item),
        min_items: None,
        max_items: None,
        exact_items: None,
    })
}

/// A schema accepting named fields, each validated by its own schema.
pub fn object_of<I, K>(fields: I) -> Schema
where
    I: IntoIterator<Item = (K, Schema)>,
    K: Into<String>,
{
    Schema::new(Kind::Object(
        fields.into_iter().map(|(k, s)| (k.into(), s)).collect(),
    ))
}

impl Schema {
    fn new(kind: Kind) -> Self {
        Self {
            kind,
            refinements: Vec::new(),
            transforms: Vec::new(),
            optional: false,
        }
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub(crate) fn refinements(&self) -> &[Refinement] {
        &self.refinements
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    // ---- constraint chainers (each returns a new Schema) ----

    /// Maximum file size, inclusive. Accepts bytes or `"10MB"`-style
    /// strings. On array schemas this applies to the element schema.
    pub fn max_size<S: Into<SizeSpec>>(&self, limit: S) -> Schema {
        let limit = limit.into();
        self.map_constraints(move |c| c.max_size = Some(limit.clone()))
    }

    /// Minimum file size, inclusive.
    pub fn min_size<S: Into<SizeSpec>>(&self, limit: S) -> Schema {
        let limit = limit.into();
        self.map_constraints(move |c| c.min_size = Some(limit.clone()))
    }

    /// Accepted MIME patterns, exact or suffix-wildcard.
    pub fn accept<I, S>(&self, patterns: I) -> Schema
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        self.map_constraints(move |c| c.accept = patterns.clone())
    }

    /// Allowed filename extensions (case-insensitive, no dots).
    pub fn extensions<I, S>(&self, extensions: I) -> Schema
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let extensions: Vec<String> = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self.map_constraints(move |c| c.extensions = extensions.clone())
    }

    /// Minimum element count for array schemas.
    pub fn min_items(&self, n: usize) -> Schema {
        self.map_array(|min, _, _| *min = Some(n))
    }

    /// Maximum element count for array schemas.
    pub fn max_items(&self, n: usize) -> Schema {
        self.map_array(|_, max, _| *max = Some(n))
    }

    /// Exact element count for array schemas.
    pub fn length(&self, n: usize) -> Schema {
        self.map_array(|_, _, exact| *exact = Some(n))
    }

    /// Append a custom rule, run in order after constraint checks.
    pub fn refine<F>(&self, rule: F) -> Schema
    where
        F: Fn(&FileValue, &RefineContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut next = self.clone();
        next.refinements.push(Arc::new(rule));
        next
    }

    /// Append a transform, applied in order once validation passes.
    pub fn transform<F>(&self, f: F) -> Schema
    where
        F: Fn(FileValue) -> FileValue + Send + Sync + 'static,
    {
        let mut next = self.clone();
        next.transforms.push(Arc::new(f));
        next
    }

    /// Absent input short-circuits to success.
    pub fn optional(&self) -> Schema {
        let mut next = self.clone();
        next.optional = true;
        next
    }

    fn map_constraints<F>(&self, apply: F) -> Schema
    where
        F: Fn(&mut FileConstraints),
    {
        let mut next = self.clone();
        match &mut next.kind {
            Kind::File(c) | Kind::Image(c) => apply(c),
            Kind::Array { item, .. } => {
                *item = Box::new(item.map_constraints(apply));
            }
            // No sensible single target on an object; constrain its fields.
            Kind::Object(_) => {}
        }
        next
    }

    fn map_array<F>(&self, apply: F) -> Schema
    where
        F: FnOnce(&mut Option<usize>, &mut Option<usize>, &mut Option<usize>),
    {
        let mut next = self.clone();
        if let Kind::Array {
            min_items,
            max_items,
            exact_items,
            ..
        } = &mut next.kind
        {
            apply(min_items, max_items, exact_items);
        }
        next
    }

    // ---- validation ----

    /// Run the full pipeline: optional short-circuit, kind check, ordered
    /// refinements, ordered transforms.
    pub fn validate(&self, input: &FileValue) -> Result<FileValue, SchemaIssue> {
        self.validate_at(input, "", &RefineContext::default())
    }

    pub(crate) fn validate_at(
        &self,
        input: &FileValue,
        path: &str,
        ctx: &RefineContext,
    ) -> Result<FileValue, SchemaIssue> {
        if matches!(input, FileValue::Absent) {
            if self.optional {
                return Ok(FileValue::Absent);
            }
            return Err(SchemaIssue::missing(path));
        }

        let mut value = self.check_kind(input, path, ctx)?;

        for rule in &self.refinements {
            rule(&value, ctx).map_err(|e| SchemaIssue::custom(path, e.to_string()))?;
        }

        for t in &self.transforms {
            value = t(value);
        }

        Ok(value)
    }

    fn check_kind(
        &self,
        input: &FileValue,
        path: &str,
        ctx: &RefineContext,
    ) -> Result<FileValue, SchemaIssue> {
        match &self.kind {
            Kind::File(constraints) => {
                let d = expect_file(input, path)?;
                constraints.check(d, path, &[])?;
                Ok(FileValue::File(d.clone()))
            }
            Kind::Image(constraints) => {
                let d = expect_file(input, path)?;
                constraints.check(d, path, &["image/*"])?;
                Ok(FileValue::File(d.clone()))
            }
            Kind::Array {
                item,
                min_items,
                max_items,
                exact_items,
            } => {
                let items = match input {
                    FileValue::List(items) => items,
                    other => {
                        return Err(SchemaIssue::new(
                            codes::INVALID_TYPE,
                            format!("Expected a list, got {}", other.kind_name()),
                            path,
                        ))
                    }
                };

                check_count(items.len(), *min_items, *max_items, *exact_items, path)?;

                let mut out = Vec::with_capacity(items.len());
                for (i, element) in items.iter().enumerate() {
                    // First element failure wins, index-qualified.
                    out.push(item.validate_at(element, &join_index(path, i), ctx)?);
                }
                Ok(FileValue::List(out))
            }
            Kind::Object(fields) => {
                let map = match input {
                    FileValue::Map(map) => map,
                    other => {
                        return Err(SchemaIssue::new(
                            codes::INVALID_TYPE,
                            format!("Expected named fields, got {}", other.kind_name()),
                            path,
                        ))
                    }
                };

                for key in map.keys() {
                    if !fields.contains_key(key) {
                        return Err(SchemaIssue::new(
                            codes::INVALID_VALUE,
                            format!("Unexpected field '{key}'"),
                            join_field(path, key),
                        ));
                    }
                }

                // Every field's refinements see the full sibling map.
                let field_ctx = RefineContext {
                    siblings: Some(map),
                };

                let mut out = BTreeMap::new();
                for (name, field_schema) in fields {
                    let field_value = map.get(name).unwrap_or(&FileValue::Absent);
                    let validated =
                        field_schema.validate_at(field_value, &join_field(path, name), &field_ctx)?;
                    if !matches!(validated, FileValue::Absent) {
                        out.insert(name.clone(), validated);
                    }
                }
                Ok(FileValue::Map(out))
            }
        }
    }
}

fn expect_file<'a>(input: &'a FileValue, path: &str) -> Result<&'a uplink_core::FileDescriptor, SchemaIssue> {
    input.as_file().ok_or_else(|| {
        SchemaIssue::new(
            codes::INVALID_TYPE,
            format!("Expected a file, got {}", input.kind_name()),
            path,
        )
    })
}

pub(crate) fn check_count(
    len: usize,
    min: Option<usize>,
    max: Option<usize>,
    exact: Option<usize>,
    path: &str,
) -> Result<(), SchemaIssue> {
    if let Some(exact) = exact {
        if len != exact {
            let code = if len > exact {
                codes::TOO_MANY_ITEMS
            } else {
                codes::TOO_FEW_ITEMS
            };
            return Err(SchemaIssue::new(
                code,
                format!("Expected exactly {exact} items, got {len}"),
                path,
            ));
        }
    }
    if let Some(min) = min {
        if len < min {
            return Err(SchemaIssue::new(
                codes::TOO_FEW_ITEMS,
                format!("Expected at least {min} items, got {len}"),
                path,
            ));
        }
    }
    if let Some(max) = max {
        if len > max {
            return Err(SchemaIssue::new(
                codes::TOO_MANY_ITEMS,
                format!("Expected at most {max} items, got {len}"),
                path,
            ));
        }
    }
    Ok(())
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            Kind::File(_) => "file",
            Kind::Image(_) => "image",
            Kind::Array { .. } => "array",
            Kind::Object(_) => "object",
        };
        f.debug_struct("Schema")
            .field("kind", &kind)
            .field("refinements", &self.refinements.len())
            .field("transforms", &self.transforms.len())
            .field("optional", &self.optional)
            .finish()
    }
}
