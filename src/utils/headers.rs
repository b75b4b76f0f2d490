//! # 请求头变量解析
//!
//! 将管理员配置的请求头模板渲染为最终值，并按规则改写出站请求头。
//! 解析分两遍：先替换密钥参数占位符 `${API_KEY}{name}`，再做固定占位符的
//! 字面量替换，顺序不可调换，否则第一遍的输出会被第二遍误改。

use crate::logging::{LogComponent, LogStage};
use crate::lwarn;
use axum::http::header::{HeaderMap, HeaderName, HeaderValue};
use entity::{api_keys, groups};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static API_KEY_PARAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{API_KEY\}\{([^}]+)\}").expect("API key param pattern compiles")
});

/// 请求头变量解析上下文
///
/// 每个请求构造一次，仅通过参数传递，绝不挂到全局状态
#[derive(Debug, Clone)]
pub struct HeaderVariableContext<'a> {
    /// 客户端IP
    pub client_ip: String,
    /// 当前分组
    pub group: Option<&'a groups::Model>,
    /// 当前密钥
    pub api_key: Option<&'a api_keys::Model>,
}

impl<'a> HeaderVariableContext<'a> {
    /// 创建不携带客户端IP的上下文（内部发起的请求，如密钥验证）
    #[must_use]
    pub fn new(group: Option<&'a groups::Model>, api_key: Option<&'a api_keys::Model>) -> Self {
        Self {
            client_ip: "127.0.0.1".to_string(),
            group,
            api_key,
        }
    }

    /// 创建携带客户端IP的上下文
    #[must_use]
    pub fn with_client_ip(
        client_ip: impl Into<String>,
        group: Option<&'a groups::Model>,
        api_key: Option<&'a api_keys::Model>,
    ) -> Self {
        Self {
            client_ip: client_ip.into(),
            group,
            api_key,
        }
    }
}

/// 单条请求头规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRule {
    /// 请求头名称
    pub key: String,
    /// 动作
    pub action: HeaderRuleAction,
    /// 值模板，仅 `set` 动作使用
    #[serde(default)]
    pub value: String,
}

/// 请求头规则动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderRuleAction {
    /// 解析模板后覆盖写入
    Set,
    /// 删除
    Remove,
}

/// 解析请求头值模板中的动态变量
///
/// 无上下文时原样返回模板。支持的固定占位符：`${CLIENT_IP}`、
/// `${TIMESTAMP_MS}`、`${TIMESTAMP_S}`、`${GROUP_NAME}`（仅分组存在时）、
/// `${API_KEY}`（仅密钥存在时，替换为原始密钥值）
#[must_use]
pub fn resolve_header_variables(value: &str, ctx: Option<&HeaderVariableContext<'_>>) -> String {
    let Some(ctx) = ctx else {
        return value.to_string();
    };

    let now = chrono::Utc::now();

    let mut result = resolve_api_key_params(value, ctx);

    result = result.replace("${CLIENT_IP}", &ctx.client_ip);
    result = result.replace("${TIMESTAMP_MS}", &now.timestamp_millis().to_string());
    result = result.replace("${TIMESTAMP_S}", &now.timestamp().to_string());

    if let Some(group) = ctx.group {
        result = result.replace("${GROUP_NAME}", &group.name);
    }
    if let Some(api_key) = ctx.api_key {
        result = result.replace("${API_KEY}", &api_key.key_value);
    }

    result
}

/// 解析 `${API_KEY}{param_name}` 占位符
///
/// 密钥、解析结果或参数缺失时替换为空字符串；无法提取参数名的残缺
/// 写法原样保留
fn resolve_api_key_params(value: &str, ctx: &HeaderVariableContext<'_>) -> String {
    let parsed = ctx.api_key.and_then(|key| key.parsed_key.as_ref());

    API_KEY_PARAM_RE
        .replace_all(value, |caps: &Captures<'_>| {
            parsed.map_or_else(String::new, |p| p.get_param(&caps[1]).to_string())
        })
        .into_owned()
}

/// 按顺序对出站请求头应用规则
///
/// 规则名称统一转为规范形式（`HeaderName` 的小写形式），同名规则后者覆盖
/// 前者。非法的名称或解析后的非法值无法写入 `HeaderMap`，跳过并告警
pub fn apply_header_rules(
    headers: &mut HeaderMap,
    rules: &[HeaderRule],
    ctx: Option<&HeaderVariableContext<'_>>,
) {
    if rules.is_empty() {
        return;
    }

    for rule in rules {
        let Ok(name) = HeaderName::from_bytes(rule.key.trim().as_bytes()) else {
            lwarn!(
                "system",
                LogStage::RequestModify,
                LogComponent::HeaderResolver,
                "bad_header_name",
                "请求头规则名称非法，跳过",
                header_key = %rule.key
            );
            continue;
        };

        match rule.action {
            HeaderRuleAction::Remove => {
                headers.remove(&name);
            }
            HeaderRuleAction::Set => {
                let resolved = resolve_header_variables(&rule.value, ctx);
                match HeaderValue::from_str(&resolved) {
                    Ok(value) => {
                        headers.insert(name, value);
                    }
                    Err(e) => {
                        lwarn!(
                            "system",
                            LogStage::RequestModify,
                            LogComponent::HeaderResolver,
                            "bad_header_value",
                            "解析后的请求头值非法，跳过",
                            header_key = %rule.key,
                            error = %e
                        );
                    }
                }
            }
        }
    }
}

/// 读取分组配置的请求头规则
///
/// 规则以 JSON 数组存储在分组上，内容非法时返回空列表并告警
#[must_use]
pub fn group_header_rules(group: &groups::Model) -> Vec<HeaderRule> {
    serde_json::from_value(group.header_rules.clone()).unwrap_or_else(|e| {
        lwarn!(
            "system",
            LogStage::RequestModify,
            LogComponent::HeaderResolver,
            "bad_header_rules",
            "分组请求头规则反序列化失败，按无规则处理",
            group_id = group.id,
            error = %e
        );
        Vec::new()
    })
}
