//! Task payload types: granules, their files, and the per-task config.
//!
//! These mirror the JSON handed to the activity by the workflow engine.
//! Unknown fields on granules and files are kept so a payload can be passed
//! through unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// File type tag selected for checksumming.
pub const DATA_FILE_TYPE: &str = "data";

/// One file belonging to a granule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GranuleFile {
    /// Opaque locator: `s3://...`, `http(s)://...`, `file://...` or a local path.
    pub filename: String,
    /// Category tag, e.g. `"data"` or `"metadata"`.
    #[serde(rename = "type")]
    pub file_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GranuleFile {
    pub fn new(filename: impl Into<String>, file_type: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            file_type: file_type.into(),
            extra: Map::new(),
        }
    }

    pub fn is_data(&self) -> bool {
        self.file_type == DATA_FILE_TYPE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Granule {
    pub files: Vec<GranuleFile>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Granule {
    pub fn new(files: Vec<GranuleFile>) -> Self {
        Self {
            files,
            extra: Map::new(),
        }
    }
}

/// Activity input: `{"granules": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInput {
    pub granules: Vec<Granule>,
}

impl TaskInput {
    /// Every filename across all granules, in granule then file order.
    pub fn original_filenames(&self) -> Vec<String> {
        self.granules
            .iter()
            .flat_map(|g| g.files.iter())
            .map(|f| f.filename.clone())
            .collect()
    }

    /// Filenames of files tagged `"data"`, in the same order.
    pub fn data_filenames(&self) -> Vec<String> {
        self.granules
            .iter()
            .flat_map(|g| g.files.iter())
            .filter(|f| f.is_data())
            .map(|f| f.filename.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    pub version: String,
}

impl Collection {
    /// `<name>__<version>`, the collection segment of staging keys.
    pub fn id(&self) -> String {
        format!("{}__{}", self.name, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buckets {
    pub internal: Bucket,
}

/// Per-task configuration. Missing keys fail deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub collection: Collection,
    pub buckets: Buckets,
    pub stack: String,
}

/// Full task message: input plus config, as queued for the activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub input: TaskInput,
    pub config: TaskConfig,
}
