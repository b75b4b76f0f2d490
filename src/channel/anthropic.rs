//! # Anthropic 渠道

use super::{ValidationChannel, body_snippet, classify_upstream_status, first_upstream_url};
use crate::error::{ProxyError, Result};
use crate::utils::{HeaderVariableContext, apply_header_rules, group_header_rules};
use async_trait::async_trait;
use axum::http::StatusCode;
use axum::http::header::{HeaderMap, HeaderName, HeaderValue};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic 协议的验证渠道，密钥通过 `x-api-key` 请求头传递
#[derive(Debug)]
pub struct AnthropicChannel {
    client: reqwest::Client,
}

impl AnthropicChannel {
    /// 使用共享的 HTTP 客户端创建渠道
    #[must_use]
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ValidationChannel for AnthropicChannel {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn validate_key(
        &self,
        key: &entity::api_keys::Model,
        group: &entity::groups::Model,
    ) -> Result<()> {
        let base = first_upstream_url(group)?;
        let url = format!("{base}/v1/models");

        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(key.actual_key())
            .map_err(|e| ProxyError::validation_with_source("密钥包含非法字符，无法写入请求头", e))?;
        headers.insert(HeaderName::from_static("x-api-key"), api_key);
        headers.insert(
            HeaderName::from_static("anthropic-version"),
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let ctx = HeaderVariableContext::new(Some(group), Some(key));
        apply_header_rules(&mut headers, &group_header_rules(group), Some(&ctx));

        let response = self
            .client
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| ProxyError::network_with_source(format!("请求上游 {url} 失败"), e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        classify_upstream_status(
            status,
            &body_snippet(&body),
            &[StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN],
        )
    }
}
