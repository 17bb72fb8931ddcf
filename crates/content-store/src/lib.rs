//! In-memory store for uploaded files with bounded retention.
//!
//! Records are immutable once inserted and handed out as `Arc`s, so the
//! store's lock only ever guards the map operation itself. Extraction and
//! search run on the caller's clone without blocking other uploads.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;

use docfind_common::DocError;

/// One uploaded file.
#[derive(Debug)]
pub struct FileRecord {
    /// 128-bit random token, hex encoded.
    pub id: String,
    pub data: Arc<[u8]>,
    pub filename: String,
    /// Absolute path on the uploading client's machine, if it sent one.
    pub original_path: Option<String>,
    pub size: usize,
    pub uploaded_at: DateTime<Utc>,
}

/// Source of "now" for upload timestamps and expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::weeks(52_000));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct FileStore {
    records: Mutex<HashMap<String, Arc<FileRecord>>>,
    clock: Arc<dyn Clock>,
    retention: Duration,
}

impl FileStore {
    pub fn new(retention: Duration) -> Self {
        Self::with_clock(retention, Arc::new(SystemClock))
    }

    pub fn with_clock(retention: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            clock,
            retention,
        }
    }

    /// Store `data` and return its new identifier.
    pub fn put(&self, data: Vec<u8>, filename: &str, original_path: Option<String>) -> String {
        let size = data.len();
        let data: Arc<[u8]> = data.into();
        let uploaded_at = self.clock.now();

        let id = loop {
            let record = Arc::new(FileRecord {
                id: new_id(),
                data: data.clone(),
                filename: filename.to_string(),
                original_path: original_path.clone(),
                size,
                uploaded_at,
            });
            // A 128-bit collision is not expected, but an id must never be reused.
            match self.lock().entry(record.id.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => break slot.insert(record).id.clone(),
            }
        };

        tracing::info!("stored file id={id} name={filename} size={size}");
        id
    }

    /// Resolve an identifier. Records past the retention window are
    /// reported as not found even before a sweep removes them.
    pub fn get(&self, id: &str) -> Result<Arc<FileRecord>, DocError> {
        let record = self.lock().get(id).cloned().ok_or(DocError::NotFound)?;
        if is_expired(&record, self.clock.now(), self.retention) {
            return Err(DocError::NotFound);
        }
        Ok(record)
    }

    /// Remove every record older than `max_age`; returns how many were removed.
    pub fn sweep_expired(&self, max_age: Duration) -> usize {
        let now = self.clock.now();
        let mut records = self.lock();
        let before = records.len();
        records.retain(|_, r| !is_expired(r, now, max_age));
        before - records.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<FileRecord>>> {
        // Map operations cannot leave the map half-updated, so a poisoned
        // lock is still safe to use.
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn new_id() -> String {
    let n: u128 = rand::rng().random();
    format!("{n:032x}")
}

fn is_expired(record: &FileRecord, now: DateTime<Utc>, max_age: Duration) -> bool {
    // A negative age (clock stepped back) is never expired.
    now.signed_duration_since(record.uploaded_at)
        .to_std()
        .map(|age| age > max_age)
        .unwrap_or(false)
}
