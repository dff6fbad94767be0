//! `data:` URL 编解码（只支持 base64 形式）。

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("not a data url")]
    MissingScheme,
    #[error("data url has no payload separator")]
    MissingComma,
    #[error("only base64 data urls are supported")]
    NotBase64,
    #[error("invalid base64 payload: {0}")]
    Base64(String),
}

pub fn encode(media_type: &str, bytes: &[u8]) -> String {
    format!("data:{media_type};base64,{}", STANDARD.encode(bytes))
}

/// 返回 (media type, 原始字节)。
pub fn decode(url: &str) -> Result<(String, Vec<u8>), DataUrlError> {
    let rest = url
        .trim()
        .strip_prefix("data:")
        .ok_or(DataUrlError::MissingScheme)?;
    let (header, payload) = rest.split_once(',').ok_or(DataUrlError::MissingComma)?;

    let mut params = header.split(';');
    let media_type = params.next().unwrap_or_default().trim().to_string();
    if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        return Err(DataUrlError::NotBase64);
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| DataUrlError::Base64(e.to_string()))?;
    Ok((media_type, bytes))
}
