//! tally-storage-json
//!
//! JSON file persistence for the tracker tables. Plugs into
//! [`tally_core::TableStore`] through the [`Persistence`] trait.

use std::{
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tally_core::{CoreError, Persistence, TableStore, TrackerData};
use tracing::debug;

pub const SCHEMA_VERSION: u32 = 1;
pub const DATA_FILE_NAME: &str = "tracker.json";
const TMP_SUFFIX: &str = "tmp";

#[derive(Debug, Serialize, Deserialize)]
struct StoredTables {
    schema_version: u32,
    #[serde(flatten)]
    data: TrackerData,
}

/// Filesystem-backed JSON persistence for one tracker data file.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Uses `tracker.json` inside `dir`, creating the directory if needed.
    pub fn in_dir(dir: &Path) -> Result<Self, CoreError> {
        fs::create_dir_all(dir)?;
        Ok(Self::new(dir.join(DATA_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persistence for JsonFileStorage {
    fn load(&self) -> Result<TrackerData, CoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => parse_tables(&raw),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(TrackerData::default()),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, data: &TrackerData) -> Result<(), CoreError> {
        save_tables_to_path(data, &self.path)?;
        debug!(path = %self.path.display(), "tracker data saved");
        Ok(())
    }
}

/// Opens a store persisted to `tracker.json` inside `dir`.
pub fn open_store(dir: &Path) -> Result<TableStore, CoreError> {
    TableStore::open(Box::new(JsonFileStorage::in_dir(dir)?))
}

/// Saves the tables to an arbitrary path, replacing the file atomically.
pub fn save_tables_to_path(data: &TrackerData, path: &Path) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    write_atomic(&tmp, &serialize_tables(data)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Loads the tables from the provided filesystem path.
pub fn load_tables_from_path(path: &Path) -> Result<TrackerData, CoreError> {
    parse_tables(&fs::read_to_string(path)?)
}

fn parse_tables(raw: &str) -> Result<TrackerData, CoreError> {
    let stored: StoredTables =
        serde_json::from_str(raw).map_err(|err| CoreError::Serde(err.to_string()))?;
    if stored.schema_version > SCHEMA_VERSION {
        return Err(CoreError::Storage(format!(
            "data file schema v{} is newer than supported v{}",
            stored.schema_version, SCHEMA_VERSION
        )));
    }
    Ok(stored.data)
}

fn serialize_tables(data: &TrackerData) -> Result<String, CoreError> {
    let stored = StoredTables {
        schema_version: SCHEMA_VERSION,
        data: data.clone(),
    };
    serde_json::to_string_pretty(&stored).map_err(|err| CoreError::Serde(err.to_string()))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
