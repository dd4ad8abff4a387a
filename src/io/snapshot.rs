//! Versioned encoding of the task tree for the blob store.
//!
//! Current layout: `{"version": 1, "tasks": [Task, ...]}`. A bare array of
//! tasks (the layout before versioning) is still accepted when decoding.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::io::blob_store::StorageError;
use crate::model::task::TaskList;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct Snapshot<'a> {
    version: u32,
    tasks: &'a TaskList,
}

#[derive(Deserialize)]
struct Header {
    #[serde(default)]
    version: Option<u64>,
}

#[derive(Deserialize)]
struct Body {
    #[serde(default)]
    tasks: TaskList,
}

pub fn encode(tasks: &TaskList) -> Result<String, StorageError> {
    Ok(serde_json::to_string(&Snapshot {
        version: SNAPSHOT_VERSION,
        tasks,
    })?)
}

pub fn decode(blob: &str) -> Result<TaskList, StorageError> {
    if blob.trim_start().starts_with('[') {
        return Ok(from_str_unbounded(blob)?);
    }

    let found = from_str_unbounded::<Header>(blob)?.version.unwrap_or(0);
    if found == 0 || found > u64::from(SNAPSHOT_VERSION) {
        return Err(StorageError::UnsupportedVersion {
            found,
            supported: SNAPSHOT_VERSION,
        });
    }
    Ok(from_str_unbounded::<Body>(blob)?.tasks)
}

/// Parse JSON nested to any depth. Task trees have no depth limit, so
/// serde_json's recursion limit is lifted and the stack grows on demand.
pub fn from_str_unbounded<T: DeserializeOwned>(json: &str) -> Result<T, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_str(json);
    de.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(value)
}
