//! # Gemini 渠道

use super::{ValidationChannel, body_snippet, classify_upstream_status, first_upstream_url};
use crate::error::{ProxyError, Result};
use crate::utils::{HeaderVariableContext, apply_header_rules, group_header_rules};
use async_trait::async_trait;
use axum::http::StatusCode;
use axum::http::header::HeaderMap;

/// Gemini 协议的验证渠道，密钥通过查询参数传递
///
/// Gemini 对无效密钥返回 400，归类时一并视为密钥被拒绝
#[derive(Debug)]
pub struct GeminiChannel {
    client: reqwest::Client,
}

impl GeminiChannel {
    /// 使用共享的 HTTP 客户端创建渠道
    #[must_use]
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ValidationChannel for GeminiChannel {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn validate_key(
        &self,
        key: &entity::api_keys::Model,
        group: &entity::groups::Model,
    ) -> Result<()> {
        let base = first_upstream_url(group)?;
        let url = format!(
            "{base}/v1beta/models?key={}",
            urlencoding::encode(key.actual_key())
        );

        let mut headers = HeaderMap::new();
        let ctx = HeaderVariableContext::new(Some(group), Some(key));
        apply_header_rules(&mut headers, &group_header_rules(group), Some(&ctx));

        let response = self
            .client
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| ProxyError::network_with_source(format!("请求上游 {base} 失败"), e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        classify_upstream_status(
            status,
            &body_snippet(&body),
            &[
                StatusCode::BAD_REQUEST,
                StatusCode::UNAUTHORIZED,
                StatusCode::FORBIDDEN,
            ],
        )
    }
}
