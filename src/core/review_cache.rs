use crate::domain::model::RawRecord;
use crate::domain::ports::Storage;
use crate::utils::error::{EngineError, Result};
use serde_json::Value;
use std::sync::Arc;

struct CachedSnapshot {
    path: String,
    records: Arc<Vec<RawRecord>>,
}

/// 本地評論快照的載入器，只記住最近一次解析的檔案。
///
/// 同一路徑重複載入時直接回傳先前的解析結果，不會再讀檔。
/// 這個型別本身不做同步，多個呼叫端同時使用時需由持有者加鎖
/// 或各自建立一份。
pub struct ReviewCache<S: Storage> {
    storage: S,
    slot: Option<CachedSnapshot>,
}

impl<S: Storage> ReviewCache<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            slot: None,
        }
    }

    pub async fn load(&mut self, path: &str) -> Result<Arc<Vec<RawRecord>>> {
        if let Some(snapshot) = &self.slot {
            if snapshot.path == path {
                tracing::debug!("Cache hit for {}", path);
                return Ok(Arc::clone(&snapshot.records));
            }
        }

        tracing::debug!("Reading review snapshot from {}", path);
        let bytes = self.storage.read_file(path).await.map_err(|e| match e {
            EngineError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                EngineError::not_found(format!("local review file {}", path))
            }
            other => other,
        })?;

        let records = Arc::new(parse_snapshot(&bytes)?);
        tracing::info!("📂 Loaded {} reviews from {}", records.len(), path);

        self.slot = Some(CachedSnapshot {
            path: path.to_string(),
            records: Arc::clone(&records),
        });
        Ok(records)
    }
}

/// 接受評論陣列，或帶有 `reviews` 陣列的物件
pub fn parse_snapshot(bytes: &[u8]) -> Result<Vec<RawRecord>> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let root: Value = serde_json::from_slice(bytes)
        .map_err(|e| EngineError::parse(format!("review snapshot is not valid JSON: {}", e)))?;

    let items = match root {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("reviews") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(EngineError::parse(
                    "review snapshot object has no `reviews` list",
                ))
            }
        },
        _ => return Err(EngineError::parse("review snapshot must be a list or object")),
    };

    let total = items.len();
    let records: Vec<RawRecord> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let record = RawRecord::from_value(item);
            if record.is_none() {
                tracing::warn!("Skipping review #{}: not an object", index);
            }
            record
        })
        .collect();

    if records.len() < total {
        tracing::warn!("Dropped {} malformed reviews", total - records.len());
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ErrorCategory;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct CountingStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
        reads: Arc<AtomicUsize>,
    }

    impl CountingStorage {
        async fn put(&self, path: &str, content: &str) {
            self.files
                .lock()
                .await
                .insert(path.to_string(), content.as_bytes().to_vec());
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    impl Storage for CountingStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EngineError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }
    }

    #[tokio::test]
    async fn test_repeated_load_is_cache_hit() {
        let storage = CountingStorage::default();
        storage
            .put("a.json", r#"[{"評論者": "A", "留言日期": "2024/01/01"}]"#)
            .await;

        let mut cache = ReviewCache::new(storage.clone());
        let first = cache.load("a.json").await.unwrap();
        let second = cache.load("a.json").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(storage.reads(), 1);
    }

    #[tokio::test]
    async fn test_different_path_replaces_slot() {
        let storage = CountingStorage::default();
        storage.put("a.json", r#"[{"author_name": "A"}]"#).await;
        storage
            .put("b.json", r#"{"reviews": [{"author_name": "B"}, {"author_name": "C"}]}"#)
            .await;

        let mut cache = ReviewCache::new(storage.clone());
        assert_eq!(cache.load("a.json").await.unwrap().len(), 1);
        assert_eq!(cache.load("b.json").await.unwrap().len(), 2);
        assert_eq!(cache.load("a.json").await.unwrap().len(), 1);
        assert_eq!(storage.reads(), 3);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let mut cache = ReviewCache::new(CountingStorage::default());
        let err = cache.load("missing.json").await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[tokio::test]
    async fn test_malformed_file_is_parse_error_and_not_cached() {
        let storage = CountingStorage::default();
        storage.put("bad.json", "{not json").await;

        let mut cache = ReviewCache::new(storage.clone());
        let err = cache.load("bad.json").await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Parse);

        storage.put("bad.json", "[]").await;
        assert!(cache.load("bad.json").await.unwrap().is_empty());
        assert_eq!(storage.reads(), 2);
    }

    #[test]
    fn test_parse_snapshot_shapes() {
        assert_eq!(parse_snapshot(b"[{}, 3, {\"a\": 1}]").unwrap().len(), 2);
        assert!(parse_snapshot(b"{\"name\": \"x\"}").is_err());
        assert!(parse_snapshot(b"42").is_err());
        assert_eq!(parse_snapshot(b"\xEF\xBB\xBF[]").unwrap().len(), 0);
    }
}
