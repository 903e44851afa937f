//! Batch adaptation: validating an authorize call's flat file list.
//!
//! Authorization requests arrive as an ordered `files[]` array, but a route
//! schema may describe a single file, an array, or named fields. This module
//! maps the batch onto the schema while keeping per-file isolation: one
//! file's failure never poisons a sibling's result, except where a failure
//! is genuinely batch-level (count bounds, whole-list refinements, a missing
//! required field).

use uplink_core::FileDescriptor;

use crate::issue::{codes, join_index, SchemaIssue};
use crate::schema::{Kind, Schema};
use crate::value::{FileValue, RefineContext};

impl Schema {
    /// Validate an ordered batch of files, returning one result per input
    /// file in the same order.
    pub fn validate_files(&self, files: &[FileDescriptor]) -> Vec<Result<(), SchemaIssue>> {
        match self.kind() {
            Kind::File(_) | Kind::Image(_) => files
                .iter()
                .map(|f| self.validate(&f.clone().into()).map(|_| ()))
                .collect(),
            Kind::Array { .. } => self.validate_as_array(files),
            Kind::Object(_) => self.validate_as_object(files),
        }
    }

    fn validate_as_array(&self, files: &[FileDescriptor]) -> Vec<Result<(), SchemaIssue>> {
        let (item, bounds_issue) = match self.kind() {
            Kind::Array {
                item,
                min_items,
                max_items,
                exact_items,
            } => (
                item,
                crate::schema::check_count(files.len(), *min_items, *max_items, *exact_items, ""),
            ),
            _ => unreachable!("validate_as_array on non-array schema"),
        };

        // Count bounds are a property of the whole batch.
        if let Err(issue) = bounds_issue {
            return vec![Err(issue); files.len()];
        }

        let ctx = RefineContext::default();
        let mut results: Vec<Result<FileValue, SchemaIssue>> = files
            .iter()
            .enumerate()
            .map(|(i, f)| item.validate_at(&f.clone().into(), &join_index("", i), &ctx))
            .collect();

        // Whole-list refinements only run once every element passed; a
        // failure there is attributable to no single file.
        if results.iter().all(|r| r.is_ok()) {
            let list = FileValue::List(
                results
                    .iter()
                    .map(|r| r.as_ref().cloned().unwrap_or(FileValue::Absent))
                    .collect(),
            );
            for rule in self.refinements() {
                if let Err(e) = rule(&list, &ctx) {
                    let issue = SchemaIssue::custom("", e.to_string());
                    return vec![Err(issue); files.len()];
                }
            }
        }

        results.drain(..).map(|r| r.map(|_| ())).collect()
    }

    fn validate_as_object(&self, files: &[FileDescriptor]) -> Vec<Result<(), SchemaIssue>> {
        let fields = match self.kind() {
            Kind::Object(fields) => fields,
            _ => unreachable!("validate_as_object on non-object schema"),
        };

        let map = match FileValue::map_by_name(files.iter().cloned()) {
            FileValue::Map(map) => map,
            _ => unreachable!(),
        };

        // A required field with no matching file fails the whole batch:
        // there is no single file the failure belongs to.
        for (name, field_schema) in fields {
            if !field_schema.is_optional() && !map.contains_key(name) {
                let issue = SchemaIssue::missing(name);
                return vec![Err(issue); files.len()];
            }
        }

        let ctx = RefineContext {
            siblings: Some(&map),
        };

        files
            .iter()
            .map(|f| match fields.get(&f.name) {
                Some(field_schema) => field_schema
                    .validate_at(&f.clone().into(), &f.name, &ctx)
                    .map(|_| ()),
                None => Err(SchemaIssue::new(
                    codes::INVALID_VALUE,
                    format!("Unexpected field '{}'", f.name),
                    &f.name,
                )),
            })
            .collect()
    }
}
