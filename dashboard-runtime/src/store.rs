use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::error::{DashboardError, Result};
use crate::util::now_iso;

/// A whole-document JSON file. [`JsonStore::get`] never fails on content:
/// a missing or malformed file reads as the empty document. Writes replace
/// the file; [`JsonStore::update`] refuses to overwrite a malformed one.
///
/// Mutations made through [`JsonStore::update`] are serialized within this
/// process; another process writing the same file can still race.
pub struct JsonStore<V> {
    path: PathBuf,
    write_lock: Mutex<()>,
    _marker: std::marker::PhantomData<fn() -> V>,
}

impl<V> JsonStore<V>
where
    V: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
            _marker: std::marker::PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lenient read: a malformed file reads as the empty document.
    pub async fn get(&self) -> Result<V> {
        let Some(raw) = self.read_raw().await? else {
            return Ok(V::default());
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "ignoring unreadable store contents: {err}"
                );
                Ok(V::default())
            }
        }
    }

    /// Strict read for mutations: a malformed file is a `Storage` error.
    async fn read(&self) -> Result<V> {
        let Some(raw) = self.read_raw().await? else {
            return Ok(V::default());
        };
        serde_json::from_str(&raw).map_err(|err| {
            DashboardError::Storage(format!("{} is not valid JSON: {err}", self.path.display()))
        })
    }

    async fn read_raw(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Replace the document with `value`, pretty-printed.
    pub async fn put(&self, value: &V) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(value).await
    }

    /// Read-modify-write under the store's write lock. A malformed file is
    /// left untouched and reported as an error.
    pub async fn update<F>(&self, f: F) -> Result<V>
    where
        F: FnOnce(&mut V),
    {
        let _guard = self.write_lock.lock().await;
        let mut value = self.read().await?;
        f(&mut value);
        self.write(&value).await?;
        Ok(value)
    }

    async fn write(&self, value: &V) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_string_pretty(value)?;
        tokio::fs::write(&self.path, body).await?;
        Ok(())
    }
}

/// Service name → credential record (`api_key`/`api_token`, `notes`, `added`).
/// Records are stored as given; no schema is enforced.
pub type KeyStore = JsonStore<Map<String, Value>>;

/// Tool name → `{calls, tokens, cost, lastUsed}`. Like [`KeyStore`], the
/// document is kept as plain JSON so entries written by other tools survive
/// a round trip whatever shape they have.
pub type UsageStore = JsonStore<Map<String, Value>>;

impl UsageStore {
    /// Count one call of `tool`, adding `tokens` and `cost` (missing counts
    /// as 0). Only the entry for `tool` is touched. Returns that entry.
    pub async fn track_usage(
        &self,
        tool: &str,
        tokens: Option<f64>,
        cost: Option<f64>,
    ) -> Result<Value> {
        let usage = self
            .update(|usage| {
                let entry = usage
                    .entry(tool.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !entry.is_object() {
                    *entry = Value::Object(Map::new());
                }
                if let Value::Object(record) = entry {
                    add_to(record, "calls", 1.0);
                    add_to(record, "tokens", tokens.unwrap_or(0.0));
                    add_to(record, "cost", cost.unwrap_or(0.0));
                    record.insert("lastUsed".to_string(), Value::String(now_iso()));
                }
            })
            .await?;

        Ok(usage.get(tool).cloned().unwrap_or(Value::Null))
    }
}

/// `record[key] += delta`, where a missing or non-numeric value counts as 0.
/// Whole results stay integers so counters do not turn into `3.0`.
fn add_to(record: &mut Map<String, Value>, key: &str, delta: f64) {
    let current = record.get(key).and_then(Value::as_f64).unwrap_or(0.0);
    let sum = current + delta;
    let value = if sum.fract() == 0.0 && sum.abs() < 9.0e15 {
        Value::from(sum as i64)
    } else {
        serde_json::Number::from_f64(sum).map_or(Value::from(0), Value::Number)
    };
    record.insert(key.to_string(), value);
}
