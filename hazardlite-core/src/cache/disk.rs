//! JSON-file bucket storage.
//!
//! One file per bucket (`<root>/<bucket>.json`) holding a map of request key
//! to response. Buckets are mirrored in memory and every write rewrites the
//! whole bucket file through a temporary file and a rename, so a bucket on
//! disk is always either the old or the new version.

use super::{validate_bucket_name, CacheError, CacheStorage, CachedResponse};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

type Bucket = BTreeMap<String, CachedResponse>;

pub struct DiskCacheStorage {
    root: PathBuf,
    buckets: Mutex<BTreeMap<String, Bucket>>,
}

impl DiskCacheStorage {
    /// Opens (or creates) the storage directory and loads existing buckets.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let mut buckets = BTreeMap::new();
        for entry in fs::read_dir(&root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if validate_bucket_name(name).is_err() {
                continue;
            }
            // unreadable buckets stay listed, empty, until purged
            let bucket = Self::read_bucket(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "unreadable cache bucket, contents dropped");
                Bucket::new()
            });
            buckets.insert(name.to_string(), bucket);
        }

        debug!(root = %root.display(), buckets = buckets.len(), "disk cache storage opened");
        Ok(Self { root, buckets: Mutex::new(buckets) })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    fn read_bucket(path: &Path) -> Result<Bucket, CacheError> {
        let content = fs::read(path)?;
        Ok(serde_json::from_slice(&content)?)
    }

    fn write_bucket(&self, name: &str, bucket: &Bucket) -> Result<(), CacheError> {
        let json = serde_json::to_vec(bucket)?;
        let tmp = self.root.join(format!(".{name}.{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, self.bucket_path(name)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

impl CacheStorage for DiskCacheStorage {
    fn open(&self, bucket: &str) -> Result<(), CacheError> {
        validate_bucket_name(bucket)?;
        let mut buckets = self.buckets.lock();
        if !buckets.contains_key(bucket) {
            let empty = Bucket::new();
            self.write_bucket(bucket, &empty)?;
            buckets.insert(bucket.to_string(), empty);
        }
        Ok(())
    }

    fn put_all(&self, bucket: &str, entries: Vec<(String, CachedResponse)>) -> Result<(), CacheError> {
        validate_bucket_name(bucket)?;
        let mut buckets = self.buckets.lock();
        let mut updated = buckets.get(bucket).cloned().unwrap_or_default();
        updated.extend(entries);
        self.write_bucket(bucket, &updated)?;
        buckets.insert(bucket.to_string(), updated);
        Ok(())
    }

    fn lookup(&self, bucket: &str, key: &str) -> Result<Option<CachedResponse>, CacheError> {
        Ok(self.buckets.lock().get(bucket).and_then(|b| b.get(key)).cloned())
    }

    fn bucket_names(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.buckets.lock().keys().cloned().collect())
    }

    fn delete_bucket(&self, bucket: &str) -> Result<bool, CacheError> {
        let mut buckets = self.buckets.lock();
        if buckets.remove(bucket).is_none() {
            return Ok(false);
        }
        match fs::remove_file(self.bucket_path(bucket)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: &str) -> CachedResponse {
        CachedResponse::new(200, Some("text/css".into()), body.as_bytes().to_vec())
    }

    #[test]
    fn test_buckets_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = DiskCacheStorage::new(dir.path()).unwrap();
            storage.open("hazardlite-cache-v1").unwrap();
            storage.put_all("hazardlite-cache-v1", vec![("/styles.css".into(), response("body{}"))]).unwrap();
        }

        let reopened = DiskCacheStorage::new(dir.path()).unwrap();
        assert_eq!(reopened.bucket_names().unwrap(), vec!["hazardlite-cache-v1".to_string()]);
        let hit = reopened.lookup("hazardlite-cache-v1", "/styles.css").unwrap().unwrap();
        assert_eq!(hit.body, b"body{}".to_vec());
    }

    #[test]
    fn test_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::new(dir.path()).unwrap();
        storage.open("old").unwrap();
        assert!(dir.path().join("old.json").exists());
        assert!(storage.delete_bucket("old").unwrap());
        assert!(!dir.path().join("old.json").exists());
        assert!(!storage.delete_bucket("old").unwrap());
    }

    #[test]
    fn test_ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        fs::write(dir.path().join("Bad Name.json"), "{}").unwrap();
        let storage = DiskCacheStorage::new(dir.path()).unwrap();
        assert!(storage.bucket_names().unwrap().is_empty());
    }

    #[test]
    fn test_unreadable_bucket_listed_and_deletable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        let storage = DiskCacheStorage::new(dir.path()).unwrap();

        assert_eq!(storage.bucket_names().unwrap(), vec!["broken".to_string()]);
        assert_eq!(storage.lookup("broken", "/index.html").unwrap(), None);
        assert!(storage.delete_bucket("broken").unwrap());
        assert!(!dir.path().join("broken.json").exists());
    }
}
