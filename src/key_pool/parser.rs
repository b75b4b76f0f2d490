//! # 密钥解析器
//!
//! 把操作员录入的原始密钥字符串还原为实际凭证与附加参数。
//! 解析方式由分组配置决定，解析本身是无状态纯函数，可任意并发调用

use crate::error::{ProxyError, Result};
use entity::ParsedKey;
use std::borrow::Cow;
use std::collections::HashMap;

/// 密钥解析方式
///
/// 闭合枚举，未识别的配置取值一律回退为恒等方式而不是报错
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum KeyParsingMethod {
    /// 恒等：原始密钥即实际密钥
    #[default]
    None,
    /// URL 查询串编码
    UrlEncode,
}

impl KeyParsingMethod {
    /// 从分组配置字符串解析
    #[must_use]
    pub fn from_config(method: &str) -> Self {
        match method {
            "urlencode" => Self::UrlEncode,
            _ => Self::None,
        }
    }

    /// 转换为配置字符串
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::UrlEncode => "urlencode",
        }
    }
}

/// 密钥解析器
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyParser;

impl KeyParser {
    /// 创建解析器
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// 按给定方式解析原始密钥
    pub fn parse(&self, raw_key: &str, method: KeyParsingMethod) -> Result<ParsedKey> {
        match method {
            KeyParsingMethod::None => Ok(ParsedKey::identity(raw_key)),
            KeyParsingMethod::UrlEncode => Self::parse_url_encoded(raw_key),
        }
    }

    /// 解析 URL 编码的密钥
    fn parse_url_encoded(raw_key: &str) -> Result<ParsedKey> {
        // 不含编码字符，原样返回
        if !raw_key.contains('=') && !raw_key.contains('&') {
            return Ok(ParsedKey::identity(raw_key));
        }

        // 含字面量 key= 时按完整查询串解析
        if raw_key.contains("key=") {
            return Self::parse_query_string(raw_key);
        }

        Self::parse_ad_hoc_segments(raw_key)
    }

    /// 按查询串解析，`key` 参数的首个非空取值为实际密钥
    fn parse_query_string(raw_key: &str) -> Result<ParsedKey> {
        let mut actual_key: Option<String> = None;
        let mut params: HashMap<String, String> = HashMap::new();

        for segment in raw_key.split('&') {
            if segment.is_empty() {
                continue;
            }

            let (name, value) = segment
                .split_once('=')
                .map_or((segment, ""), |(name, value)| (name, value));
            let name = decode_component(name)?;
            let value = decode_component(value)?;

            if name == "key" {
                if actual_key.is_none() && !value.is_empty() {
                    actual_key = Some(value);
                }
            } else {
                // 同名参数首个取值优先
                params.entry(name).or_insert(value);
            }
        }

        let actual_key = actual_key
            .ok_or_else(|| ProxyError::key_parse("URL 编码的密钥中缺少 key 参数"))?;

        Ok(ParsedKey {
            raw_key: raw_key.to_string(),
            actual_key,
            params,
        })
    }

    /// 无 `key=` 时按有序的 name=value 段解析，首段取值为实际密钥
    fn parse_ad_hoc_segments(raw_key: &str) -> Result<ParsedKey> {
        let mut actual_key = String::new();
        let mut params: HashMap<String, String> = HashMap::new();

        for (index, segment) in raw_key.split('&').enumerate() {
            if index == 0 {
                // 首段的取值作为实际密钥，段自身的参数名忽略；
                // 首段没有 name=value 结构时整段就是密钥本身
                actual_key = segment
                    .split_once('=')
                    .map_or(segment, |(_, value)| value)
                    .trim()
                    .to_string();
                continue;
            }

            let Some((name, value)) = segment.split_once('=') else {
                continue;
            };
            params.insert(name.trim().to_string(), value.trim().to_string());
        }

        if actual_key.is_empty() {
            return Err(ProxyError::key_parse("无法从 URL 编码的密钥中提取实际密钥"));
        }

        Ok(ParsedKey {
            raw_key: raw_key.to_string(),
            actual_key,
            params,
        })
    }
}

/// 解码单个查询串分量，`+` 视为空格，解码结果必须是合法 UTF-8
fn decode_component(component: &str) -> Result<String> {
    let plus_normalized = component.replace('+', " ");
    urlencoding::decode(&plus_normalized)
        .map(Cow::into_owned)
        .map_err(|e| ProxyError::key_parse(format!("URL 编码的密钥解码失败: {e}")))
}
