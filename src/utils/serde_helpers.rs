/// 序列化/反序列化辅助模块

use serde::{Deserialize, Deserializer, Serializer};

/// 上游服务的数字 id 可能以数字或字符串形式出现 (例如: `42` 或 `"42"`)
pub mod numeric_id {
    use super::*;

    pub fn serialize<S>(id: &i64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(*id)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum IdValue {
            Number(i64),
            String(String),
        }

        match IdValue::deserialize(deserializer)? {
            IdValue::Number(n) => Ok(n),
            IdValue::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| serde::de::Error::custom(format!("invalid numeric id: {}", s))),
        }
    }
}
