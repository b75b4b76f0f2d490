//! # 密钥池类型定义

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 密钥状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyStatus {
    /// 可用
    Active,
    /// 已被验证判定为无效
    Invalid,
}

impl<'de> serde::Deserialize<'de> for KeyStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct KeyStatusVisitor;

        impl serde::de::Visitor<'_> for KeyStatusVisitor {
            type Value = KeyStatus;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a string representing key status")
            }

            fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                match s {
                    "active" => Ok(KeyStatus::Active),
                    "invalid" => Ok(KeyStatus::Invalid),
                    _ => Err(E::custom(format!("unknown key status: {s}"))),
                }
            }
        }

        deserializer.deserialize_str(KeyStatusVisitor)
    }
}

impl serde::Serialize for KeyStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for KeyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "invalid" => Ok(Self::Invalid),
            _ => Err(format!("Invalid key status: {s}")),
        }
    }
}

impl KeyStatus {
    /// 转换为字符串
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Invalid => "invalid",
        }
    }
}

/// 单个密钥的验证结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyTestResult {
    /// 被验证的原始密钥值
    pub key_value: String,
    /// 是否通过验证
    pub is_valid: bool,
    /// 失败原因，成功时为空串且不序列化
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}
