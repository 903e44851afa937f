use std::collections::BTreeMap;

use uplink_core::FileDescriptor;

/// The value space schemas validate over.
///
/// `Absent` exists so optional schemas can short-circuit without a
/// separate "was the input present" channel.
#[derive(Debug, Clone, PartialEq)]
pub enum FileValue {
    Absent,
    File(FileDescriptor),
    List(Vec<FileValue>),
    Map(BTreeMap<String, FileValue>),
}

impl FileValue {
    pub fn from_files<I>(files: I) -> Self
    where
        I: IntoIterator<Item = FileDescriptor>,
    {
        FileValue::List(files.into_iter().map(FileValue::File).collect())
    }

    /// Build a map keyed by file name, for object schemas.
    pub fn map_by_name<I>(files: I) -> Self
    where
        I: IntoIterator<Item = FileDescriptor>,
    {
        FileValue::Map(
            files
                .into_iter()
                .map(|f| (f.name.clone(), FileValue::File(f)))
                .collect(),
        )
    }

    pub fn as_file(&self) -> Option<&FileDescriptor> {
        match self {
            FileValue::File(d) => Some(d),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            FileValue::Absent => "absent",
            FileValue::File(_) => "file",
            FileValue::List(_) => "list",
            FileValue::Map(_) => "map",
        }
    }
}

impl From<FileDescriptor> for FileValue {
    fn from(d: FileDescriptor) -> Self {
        FileValue::File(d)
    }
}

/// Context visible to refinements.
///
/// Object schemas populate `siblings` with every named field of the value
/// under validation, enabling cross-field rules such as "total size of all
/// files ≤ 100MB".
#[derive(Debug, Clone, Copy, Default)]
pub struct RefineContext<'a> {
    pub siblings: Option<&'a BTreeMap<String, FileValue>>,
}

impl<'a> RefineContext<'a> {
    pub fn sibling(&self, name: &str) -> Option<&'a FileValue> {
        self.siblings.and_then(|m| m.get(name))
    }

    /// Sum of the sizes of every sibling file, recursing into lists.
    pub fn sibling_total_size(&self) -> u64 {
        fn total(value: &FileValue) -> u64 {
            match value {
                FileValue::File(d) => d.size,
                FileValue::List(items) => items.iter().map(total).sum(),
                FileValue::Map(fields) => fields.values().map(total).sum(),
                FileValue::Absent => 0,
            }
        }
        self.siblings
            .map(|m| m.values().map(total).sum())
            .unwrap_or(0)
    }
}
