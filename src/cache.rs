//! Sled-backed cache of normalized analysis results, keyed by model and batch content.

use crate::error::Result;
use crate::models::{AnalysisRequest, AnalysisResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    model: String,
    results: Vec<AnalysisResult>,
    cached_at: DateTime<Utc>,
}

/// On-disk cache of normalized analysis results, keyed by model and batch
pub struct AnalysisCache {
    db: sled::Db,
    model: String,
}

impl AnalysisCache {
    /// Open or create the cache at `path`; entries are scoped to `model`
    pub fn open(path: &Path, model: &str) -> Result<Self> {
        std::fs::create_dir_all(path)?;
        let db = sled::open(path)?;

        Ok(Self {
            db,
            model: model.to_string(),
        })
    }

    fn make_key(&self, batch: &[AnalysisRequest]) -> Result<Vec<u8>> {
        // Model name first so switching models never serves stale scores
        let mut key = self.model.as_bytes().to_vec();
        key.push(0);
        key.extend(serde_json::to_vec(batch)?);
        Ok(key)
    }

    /// Cached results for this exact batch
    pub fn get(&self, batch: &[AnalysisRequest]) -> Result<Option<Vec<AnalysisResult>>> {
        let key = self.make_key(batch)?;

        let Some(data) = self.db.get(&key)? else {
            return Ok(None);
        };
        let entry: CacheEntry = bincode::deserialize(&data)?;

        // A batch is only usable if it still lines up with the request
        if entry.model != self.model || entry.results.len() != batch.len() {
            return Ok(None);
        }
        Ok(Some(entry.results))
    }

    /// Store the normalized results of a batch
    pub fn put(&self, batch: &[AnalysisRequest], results: &[AnalysisResult]) -> Result<()> {
        let key = self.make_key(batch)?;

        let entry = CacheEntry {
            model: self.model.clone(),
            results: results.to_vec(),
            cached_at: Utc::now(),
        };

        let data = bincode::serialize(&entry)?;
        self.db.insert(key, data)?;
        self.db.flush()?;

        Ok(())
    }

    /// When the batch was cached, if it is
    pub fn cached_at(&self, batch: &[AnalysisRequest]) -> Result<Option<DateTime<Utc>>> {
        let key = self.make_key(batch)?;
        let Some(data) = self.db.get(&key)? else {
            return Ok(None);
        };
        let entry: CacheEntry = bincode::deserialize(&data)?;
        Ok(Some(entry.cached_at))
    }

    /// Drop every entry
    pub fn clear(&self) -> Result<()> {
        self.db.clear()?;
        self.db.flush()?;
        Ok(())
    }
}
