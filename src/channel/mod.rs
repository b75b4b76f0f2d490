//! # 密钥验证渠道模块
//!
//! 按分组的渠道类型把密钥验证请求派发到对应的上游适配器

pub mod anthropic;
pub mod gemini;
pub mod openai;

pub use anthropic::AnthropicChannel;
pub use gemini::GeminiChannel;
pub use openai::OpenAIChannel;

use crate::error::{ProxyError, Result};
use async_trait::async_trait;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// 上游地址配置项，分组的 `upstreams` 列为该结构的 JSON 数组
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// 上游基础地址
    pub url: String,
    /// 权重，当前验证流程只取第一个条目
    #[serde(default = "default_weight")]
    pub weight: u32,
}

const fn default_weight() -> u32 {
    1
}

/// 密钥验证渠道
///
/// 一个实现对应一种上游协议；`validate_key` 发起一次廉价的带鉴权请求，
/// `Ok` 表示上游接受该密钥，`Err` 携带拒绝或传输失败的原因。
/// 调用方负责超时控制，实现内部不做超时
#[async_trait]
pub trait ValidationChannel: Send + Sync + fmt::Debug {
    /// 渠道类型名，与分组的 `channel_type` 对应
    fn name(&self) -> &'static str;

    /// 向上游验证单个密钥
    async fn validate_key(
        &self,
        key: &entity::api_keys::Model,
        group: &entity::groups::Model,
    ) -> Result<()>;
}

/// 验证渠道工厂
///
/// 持有渠道注册表，按分组的渠道类型查找
pub struct ChannelFactory {
    channels: HashMap<String, Arc<dyn ValidationChannel>>,
}

impl ChannelFactory {
    /// 创建工厂并注册内置渠道
    #[must_use]
    pub fn new() -> Self {
        let client = reqwest::Client::new();
        let mut factory = Self {
            channels: HashMap::new(),
        };
        factory.register(Arc::new(OpenAIChannel::new(client.clone())));
        factory.register(Arc::new(GeminiChannel::new(client.clone())));
        factory.register(Arc::new(AnthropicChannel::new(client)));
        factory
    }

    /// 注册渠道，类型名相同则覆盖
    pub fn register(&mut self, channel: Arc<dyn ValidationChannel>) {
        self.channels.insert(channel.name().to_string(), channel);
    }

    /// 获取分组对应的验证渠道
    pub fn get_channel(
        &self,
        group: &entity::groups::Model,
    ) -> Result<Arc<dyn ValidationChannel>> {
        self.channels.get(&group.channel_type).cloned().ok_or_else(|| {
            ProxyError::channel_unavailable(format!(
                "不支持的渠道类型: {}",
                group.channel_type
            ))
        })
    }
}

impl Default for ChannelFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChannelFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelFactory")
            .field("channels", &self.channels.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// 取分组的第一个上游地址，去掉尾部斜杠
pub(crate) fn first_upstream_url(group: &entity::groups::Model) -> Result<String> {
    let upstreams: Vec<UpstreamConfig> = serde_json::from_value(group.upstreams.clone())
        .map_err(|e| {
            ProxyError::config_with_source(format!("分组 {} 的上游配置非法", group.name), e)
        })?;

    let first = upstreams.first().ok_or_else(|| {
        ProxyError::config(format!("分组 {} 未配置上游地址", group.name))
    })?;

    Url::parse(&first.url).map_err(|e| {
        ProxyError::config_with_source(format!("分组 {} 的上游地址无法解析: {}", group.name, first.url), e)
    })?;

    Ok(first.url.trim_end_matches('/').to_string())
}

/// 根据上游响应状态归类验证结果
///
/// `invalid_statuses` 中的状态视为密钥被拒绝，其余非 2xx 视为网络/上游异常
pub(crate) fn classify_upstream_status(
    status: StatusCode,
    snippet: &str,
    invalid_statuses: &[StatusCode],
) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }

    if invalid_statuses.contains(&status) {
        return Err(ProxyError::validation(format!(
            "上游拒绝密钥: HTTP {status}: {snippet}"
        )));
    }

    Err(ProxyError::network(format!(
        "上游返回异常状态: HTTP {status}: {snippet}"
    )))
}

/// 截取响应体片段用于错误信息
pub(crate) fn body_snippet(body: &str) -> String {
    body.chars().take(200).collect()
}
