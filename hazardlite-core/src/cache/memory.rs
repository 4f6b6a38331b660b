use super::{validate_bucket_name, CacheError, CacheStorage, CachedResponse};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

/// Process-local bucket storage. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    buckets: Mutex<BTreeMap<String, HashMap<String, CachedResponse>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStorage for MemoryCacheStorage {
    fn open(&self, bucket: &str) -> Result<(), CacheError> {
        validate_bucket_name(bucket)?;
        self.buckets.lock().entry(bucket.to_string()).or_default();
        Ok(())
    }

    fn put_all(&self, bucket: &str, entries: Vec<(String, CachedResponse)>) -> Result<(), CacheError> {
        validate_bucket_name(bucket)?;
        self.buckets.lock().entry(bucket.to_string()).or_default().extend(entries);
        Ok(())
    }

    fn lookup(&self, bucket: &str, key: &str) -> Result<Option<CachedResponse>, CacheError> {
        Ok(self.buckets.lock().get(bucket).and_then(|b| b.get(key)).cloned())
    }

    fn bucket_names(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.buckets.lock().keys().cloned().collect())
    }

    fn delete_bucket(&self, bucket: &str) -> Result<bool, CacheError> {
        Ok(self.buckets.lock().remove(bucket).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_roundtrip() {
        let storage = MemoryCacheStorage::new();
        storage.open("v1").unwrap();
        storage
            .put_all("v1", vec![("/".into(), CachedResponse::new(200, Some("text/html".into()), b"<html>".to_vec()))])
            .unwrap();

        let hit = storage.lookup("v1", "/").unwrap().unwrap();
        assert_eq!(hit.content_type.as_deref(), Some("text/html"));
        assert_eq!(storage.lookup("v1", "/other").unwrap(), None);
        assert_eq!(storage.lookup("v2", "/").unwrap(), None);

        assert!(storage.delete_bucket("v1").unwrap());
        assert!(!storage.delete_bucket("v1").unwrap());
        assert!(storage.bucket_names().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_bad_bucket_name() {
        let storage = MemoryCacheStorage::new();
        assert!(matches!(storage.open("a/b"), Err(CacheError::InvalidBucketName(_))));
    }
}
