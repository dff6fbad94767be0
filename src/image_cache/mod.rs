//! 图片缓存：来源 URL → CachedImage。
//!
//! 两级结构：内存快照 + 持久化存储（`cache` 命名空间）。
//! 快照只在 `sync()` 时整体替换；抓取阶段与导出阶段不会交错，
//! 因此导出期间直接读快照即可。

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::storage::{CACHE_KEY, Storage, StorageError};

pub mod capture;
pub mod data_url;
mod model;

pub use model::CachedImage;

pub type CacheMap = HashMap<String, CachedImage>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("{url} is not cached.")]
    NotFound { url: String },
    #[error("image cache has not been synced from storage")]
    NotSynced,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("cached image store has an unexpected shape: {0}")]
    Shape(serde_json::Error),
    #[error("cached image for {url} is broken: {source}")]
    DataUrl {
        url: String,
        source: data_url::DataUrlError,
    },
}

pub struct ImageCache {
    storage: Arc<dyn Storage>,
    snapshot: Option<CacheMap>,
}

impl ImageCache {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            snapshot: None,
        }
    }

    /// 从持久化存储整体重载内存快照。
    pub fn sync(&mut self) -> Result<(), CacheError> {
        let map = self.read_durable()?;
        debug!(target: "image_cache", entries = map.len(), "缓存快照已重载");
        self.snapshot = Some(map);
        Ok(())
    }

    pub fn ensure_synced(&mut self) -> Result<(), CacheError> {
        if self.snapshot.is_none() {
            self.sync()?;
        }
        Ok(())
    }

    pub fn is_synced(&self) -> bool {
        self.snapshot.is_some()
    }

    /// 丢弃内存快照，下次 `get` 会重新读取存储。
    pub fn invalidate(&mut self) {
        self.snapshot = None;
    }

    pub fn get(&mut self, url: &str, force_sync: bool) -> Result<&CachedImage, CacheError> {
        if force_sync || self.snapshot.is_none() {
            self.sync()?;
        }
        self.lookup(url)
    }

    /// 只查当前快照，不触发同步。
    pub fn lookup(&self, url: &str) -> Result<&CachedImage, CacheError> {
        let snapshot = self.snapshot.as_ref().ok_or(CacheError::NotSynced)?;
        snapshot.get(url).ok_or_else(|| CacheError::NotFound {
            url: url.to_string(),
        })
    }

    /// 抓取阶段写入：以存储中的最新内容为基准合并，同 URL 覆盖。
    pub fn insert<I>(&mut self, images: I) -> Result<usize, CacheError>
    where
        I: IntoIterator<Item = (String, CachedImage)>,
    {
        let mut map = self.read_durable()?;
        let mut written = 0usize;
        for (url, image) in images {
            map.insert(url, image);
            written += 1;
        }
        let value = serde_json::to_value(&map).map_err(CacheError::Shape)?;
        self.storage.set(CACHE_KEY, value)?;
        self.snapshot = Some(map);
        info!(
            target: "image_cache",
            written,
            entries = self.len(),
            bytes = self.encoded_size(),
            "Current cache size"
        );
        Ok(written)
    }

    pub fn len(&self) -> usize {
        self.snapshot.as_ref().map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 快照中所有 data URL 的总长度（近似存储占用）。
    pub fn encoded_size(&self) -> usize {
        self.snapshot.as_ref().map_or(0, |map| {
            map.iter()
                .map(|(url, img)| url.len() + img.data_url.len())
                .sum()
        })
    }

    fn read_durable(&self) -> Result<CacheMap, CacheError> {
        match self.storage.get(CACHE_KEY)? {
            Some(value) => serde_json::from_value(value).map_err(CacheError::Shape),
            None => Ok(CacheMap::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::storage::{FailingStorage, MemoryStorage};

    fn sample(width: u32) -> CachedImage {
        CachedImage::jpeg(width, 1200, &[0xFF, 0xD8, 0xFF])
    }

    #[test]
    fn storage_failures_surface_as_cache_errors() {
        let mut cache = ImageCache::new(Arc::new(FailingStorage));
        assert!(matches!(
            cache.sync(),
            Err(CacheError::Storage(StorageError::Io { .. }))
        ));
        assert!(!cache.is_synced());
        assert!(matches!(
            cache.get("http://a/1.jpg", false),
            Err(CacheError::Storage(_))
        ));
        assert!(matches!(
            cache.insert([("http://a/1.jpg".to_string(), sample(800))]),
            Err(CacheError::Storage(_))
        ));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn get_returns_what_capture_wrote() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut writer = ImageCache::new(storage.clone());
        writer
            .insert([("http://a/1.jpg".to_string(), sample(800))])
            .unwrap();

        let mut reader = ImageCache::new(storage);
        let got = reader.get("http://a/1.jpg", false).unwrap();
        assert_eq!(got, &sample(800));
    }

    #[test]
    fn unknown_url_is_not_found() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut cache = ImageCache::new(storage);
        let err = cache.get("http://a/missing.jpg", false).unwrap_err();
        match err {
            CacheError::NotFound { url } => assert_eq!(url, "http://a/missing.jpg"),
            other => panic!("unexpected error: {other:?}"),
        }
        // 空存储也要同步成空快照，而不是返回默认值
        assert!(cache.is_synced());
        assert!(cache.is_empty());
    }

    #[test]
    fn snapshot_is_stale_until_forced() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut cache = ImageCache::new(storage.clone());
        cache.sync().unwrap();

        let mut other = ImageCache::new(storage);
        other
            .insert([("http://a/2.jpg".to_string(), sample(640))])
            .unwrap();

        assert!(matches!(
            cache.get("http://a/2.jpg", false),
            Err(CacheError::NotFound { .. })
        ));
        assert_eq!(cache.get("http://a/2.jpg", true).unwrap().width, 640);
    }

    #[test]
    fn lookup_requires_explicit_sync() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut cache = ImageCache::new(storage);
        assert!(matches!(cache.lookup("x"), Err(CacheError::NotSynced)));
        cache.ensure_synced().unwrap();
        cache.invalidate();
        assert!(!cache.is_synced());
    }

    #[test]
    fn insert_merges_with_durable_state() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        storage
            .set(
                CACHE_KEY,
                json!({"http://a/0.jpg": serde_json::to_value(sample(300)).unwrap()}),
            )
            .unwrap();

        let mut cache = ImageCache::new(storage);
        cache
            .insert([
                ("http://a/1.jpg".to_string(), sample(400)),
                ("http://a/0.jpg".to_string(), sample(500)),
            ])
            .unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.lookup("http://a/0.jpg").unwrap().width, 500);
        assert!(cache.encoded_size() > 0);
    }

    #[test]
    fn malformed_store_is_an_error() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        storage.set(CACHE_KEY, json!(["not", "a", "map"])).unwrap();
        let mut cache = ImageCache::new(storage);
        assert!(matches!(cache.sync(), Err(CacheError::Shape(_))));
    }
}
