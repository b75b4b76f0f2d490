//! # 解析密钥值对象
//!
//! 原始密钥字符串解析后的结构化结果，运行时挂载在密钥实体上，不落库

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 解析后的密钥信息
///
/// `raw_key` 为操作员录入的原始凭证，`actual_key` 为实际提交给上游服务的
/// 凭证，`params` 为原始密钥中附带编码的辅助参数。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedKey {
    /// 原始密钥字符串
    pub raw_key: String,
    /// 解析后的实际密钥
    pub actual_key: String,
    /// 附加参数
    pub params: HashMap<String, String>,
}

impl ParsedKey {
    /// 构造一个不携带参数的恒等解析结果（原始密钥即实际密钥）
    #[must_use]
    pub fn identity(raw_key: impl Into<String>) -> Self {
        let raw_key = raw_key.into();
        Self {
            actual_key: raw_key.clone(),
            raw_key,
            params: HashMap::new(),
        }
    }

    /// 获取指定参数的值，参数不存在时返回空字符串
    #[must_use]
    pub fn get_param(&self, name: &str) -> &str {
        self.params.get(name).map_or("", String::as_str)
    }

    /// 检查是否包含指定参数
    #[must_use]
    pub fn has_param(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_keeps_raw_as_actual() {
        let parsed = ParsedKey::identity("sk-abc123");
        assert_eq!(parsed.raw_key, "sk-abc123");
        assert_eq!(parsed.actual_key, "sk-abc123");
        assert!(parsed.params.is_empty());
    }

    #[test]
    fn test_get_param_missing_returns_empty() {
        let parsed = ParsedKey::identity("sk-abc123");
        assert_eq!(parsed.get_param("region"), "");
        assert!(!parsed.has_param("region"));
    }

    #[test]
    fn test_has_param_distinguishes_empty_value() {
        let mut parsed = ParsedKey::identity("sk-abc123");
        parsed.params.insert("region".to_string(), String::new());
        assert_eq!(parsed.get_param("region"), "");
        assert!(parsed.has_param("region"));
    }
}
