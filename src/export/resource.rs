use std::fmt;

use crate::image_cache::{CacheError, CachedImage, ImageCache};

type ByteProvider<'a> = Box<dyn Fn() -> Result<Vec<u8>, CacheError> + 'a>;

/// 一张待嵌入的图片。字节在写入器真正需要时才从缓存解码。
pub struct ImageResource<'a> {
    pub id: String,
    pub href: String,
    pub media_type: String,
    pub width: u32,
    pub height: u32,
    pub source_url: String,
    provider: ByteProvider<'a>,
}

pub fn resource_id(index: usize) -> String {
    format!("image_{index:05}")
}

pub fn resource_href(id: &str, extension: &str) -> String {
    format!("images/{id}.{}", extension.trim_start_matches('.'))
}

impl<'a> ImageResource<'a> {
    /// 根据缓存条目建立资源；字节提供者再次查询同一个快照。
    pub fn from_cache(
        index: usize,
        source_url: &str,
        cached: &CachedImage,
        cache: &'a ImageCache,
    ) -> Self {
        let id = resource_id(index);
        let href = resource_href(&id, &cached.file_extension);
        let url = source_url.to_string();
        Self {
            href,
            id,
            media_type: cached.media_type.clone(),
            width: cached.width,
            height: cached.height,
            source_url: source_url.to_string(),
            provider: Box::new(move || {
                let cached = cache.lookup(&url)?;
                cached.decode_bytes().map_err(|source| CacheError::DataUrl {
                    url: url.clone(),
                    source,
                })
            }),
        }
    }

    pub fn data(&self) -> Result<Vec<u8>, CacheError> {
        (self.provider)()
    }
}

impl fmt::Debug for ImageResource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageResource")
            .field("id", &self.id)
            .field("href", &self.href)
            .field("media_type", &self.media_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("source_url", &self.source_url)
            .finish_non_exhaustive()
    }
}
