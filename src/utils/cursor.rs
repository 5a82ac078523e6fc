use crate::error::{AppError, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{de::DeserializeOwned, Serialize};

/// 游标编解码：边界值 -> JSON -> URL 安全 Base64（无填充）
///
/// 客户端只需原样回传字符串；形状不符的游标一律解码失败。
pub struct CursorCodec;

impl CursorCodec {
    pub fn encode<T: Serialize>(boundary: &T) -> Result<String> {
        let json = serde_json::to_vec(boundary)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    pub fn decode<T: DeserializeOwned>(cursor: &str) -> Result<T> {
        let json = URL_SAFE_NO_PAD
            .decode(cursor.as_bytes())
            .map_err(|e| AppError::malformed_cursor(format!("cursor is not base64: {}", e)))?;

        serde_json::from_slice(&json)
            .map_err(|e| AppError::malformed_cursor(format!("cursor shape mismatch: {}", e)))
    }

    /// `None` 表示第一页；任何给出的字符串（包括空串）都必须能解码
    pub fn decode_opt<T: DeserializeOwned>(cursor: Option<&str>) -> Result<Option<T>> {
        cursor.map(Self::decode).transpose()
    }
}
