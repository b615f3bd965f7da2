#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use tally::Tracker;
use tally_config::{Config, ConfigManager};
use tally_core::Clock;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Test clock that can be moved forward between calls.
#[derive(Debug)]
pub struct ManualClock(Mutex<NaiveDate>);

impl ManualClock {
    pub fn new(today: NaiveDate) -> Arc<Self> {
        Arc::new(Self(Mutex::new(today)))
    }

    pub fn advance(&self, days: i64) {
        let mut today = self.0.lock().expect("lock clock");
        *today = *today + Duration::days(days);
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        *self.0.lock().expect("lock clock")
    }
}

/// Creates a unique base directory whose config points at a `data/` subfolder.
pub fn temp_base() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);

    let manager = ConfigManager::with_base_dir(base.clone()).expect("config manager");
    let config = Config {
        data_dir: Some(base.join("data")),
        ..Config::default()
    };
    manager.save(&config).expect("save config");
    base
}

/// Opens a persistent tracker rooted at `base`.
pub fn open_tracker(base: &Path, clock: Arc<dyn Clock>) -> Tracker {
    let manager = ConfigManager::with_base_dir(base.to_path_buf()).expect("config manager");
    Tracker::open(manager, clock).expect("open tracker")
}
