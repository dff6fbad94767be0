//! 页面图片抓取：宽度过滤、JPEG 重编码、写入缓存。

use image::GenericImageView;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{CacheError, CachedImage, ImageCache};
use crate::base_system::context::Config;

pub const MIN_IMAGE_WIDTH: u32 = 300;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("jpeg encode failed for {url}: {source}")]
    Encode {
        url: String,
        source: image::ImageError,
    },
    #[error(transparent)]
    Cache(#[from] CacheError),
}

#[derive(Debug, Clone, Copy)]
pub struct CaptureOptions {
    pub min_width: u32,
    pub jpeg_quality: u8,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            min_width: MIN_IMAGE_WIDTH,
            jpeg_quality: 100,
        }
    }
}

impl From<&Config> for CaptureOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            min_width: cfg.min_image_width,
            jpeg_quality: cfg.jpeg_quality,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub url: String,
    pub bytes: Vec<u8>,
}

/// 处理候选图片并写入缓存，返回按原顺序抓取到的 URL。
///
/// 解码失败的图片只记警告并跳过；编码失败与存储失败会中止整次抓取，
/// 此时缓存不会被写入任何内容。
pub fn capture_images(
    cache: &mut ImageCache,
    candidates: Vec<Candidate>,
    opts: CaptureOptions,
) -> Result<Vec<String>, CaptureError> {
    let total = candidates.len();
    let mut captured = Vec::with_capacity(total);
    let mut urls = Vec::with_capacity(total);

    for Candidate { url, bytes } in candidates {
        let img = match image::load_from_memory(&bytes) {
            Ok(img) => img,
            Err(e) => {
                warn!(target: "capture", url = %url, error = %e, "无法解码图片，已跳过");
                continue;
            }
        };
        let (width, height) = img.dimensions();
        if width < opts.min_width {
            debug!(target: "capture", url = %url, width, "图片宽度不足，已跳过");
            continue;
        }

        let jpeg = encode_jpeg(&img, opts.jpeg_quality).map_err(|source| {
            CaptureError::Encode {
                url: url.clone(),
                source,
            }
        })?;
        urls.push(url.clone());
        captured.push((url, CachedImage::jpeg(width, height, &jpeg)));
    }

    if !captured.is_empty() {
        cache.insert(captured)?;
    }
    info!(target: "capture", "Extract {} images.", urls.len());
    Ok(urls)
}

fn encode_jpeg(img: &image::DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    encoder.encode(
        &rgb,
        rgb.width(),
        rgb.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use super::*;
    use crate::storage::{MemoryStorage, Storage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn keeps_wide_images_in_order_as_jpeg() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut cache = ImageCache::new(storage);
        let candidates = vec![
            Candidate {
                url: "http://c/2.png".into(),
                bytes: png_bytes(320, 480),
            },
            Candidate {
                url: "http://c/icon.png".into(),
                bytes: png_bytes(64, 64),
            },
            Candidate {
                url: "http://c/1.png".into(),
                bytes: png_bytes(300, 450),
            },
            Candidate {
                url: "http://c/broken.png".into(),
                bytes: b"not an image".to_vec(),
            },
        ];

        let urls = capture_images(&mut cache, candidates, CaptureOptions::default()).unwrap();
        assert_eq!(urls, vec!["http://c/2.png", "http://c/1.png"]);

        let img = cache.get("http://c/2.png", true).unwrap();
        assert_eq!((img.width, img.height), (320, 480));
        assert_eq!(img.media_type, "image/jpeg");
        assert_eq!(img.file_extension, "jpg");
        let bytes = img.decode_bytes().unwrap();
        assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF]);

        assert!(matches!(
            cache.get("http://c/icon.png", false),
            Err(CacheError::NotFound { .. })
        ));
    }

    #[test]
    fn nothing_captured_leaves_store_untouched() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut cache = ImageCache::new(storage.clone());
        let urls = capture_images(
            &mut cache,
            vec![Candidate {
                url: "http://c/small.png".into(),
                bytes: png_bytes(100, 100),
            }],
            CaptureOptions::default(),
        )
        .unwrap();
        assert!(urls.is_empty());
        assert!(storage.get(crate::storage::CACHE_KEY).unwrap().is_none());
    }
}
