use serde::{Deserialize, Serialize};

use super::data_url::{self, DataUrlError};

/// 一张已缓存的图片。存储里的字段名沿用 `{width, height, type, mediaType, dataUrl}`，
/// key（来源 URL）在外层 map 上。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedImage {
    pub width: u32,
    pub height: u32,
    /// 文件扩展名，不带点，例如 `jpg`。
    #[serde(rename = "type")]
    pub file_extension: String,
    pub media_type: String,
    pub data_url: String,
}

impl CachedImage {
    pub fn jpeg(width: u32, height: u32, bytes: &[u8]) -> Self {
        Self {
            width,
            height,
            file_extension: "jpg".to_string(),
            media_type: "image/jpeg".to_string(),
            data_url: data_url::encode("image/jpeg", bytes),
        }
    }

    pub fn decode_bytes(&self) -> Result<Vec<u8>, DataUrlError> {
        data_url::decode(&self.data_url).map(|(_, bytes)| bytes)
    }
}
