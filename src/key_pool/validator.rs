//! # 密钥验证器
//!
//! 在分组上下文中判定密钥是否仍被上游服务接受，并记录判定结果。
//! 提供单密钥验证与保序的同步批量验证

use crate::channel::ChannelFactory;
use crate::config::SystemSettingsManager;
use crate::error::{Context, ProxyError, Result};
use crate::key_pool::parser::{KeyParser, KeyParsingMethod};
use crate::key_pool::store::KeyStore;
use crate::key_pool::types::KeyTestResult;
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lwarn};
use entity::{ParsedKey, api_keys, groups};
use std::collections::HashMap;
use std::sync::Arc;

/// 不存在于分组中的密钥的固定提示语，面向操作员而非技术细节
const KEY_NOT_IN_GROUP: &str = "Key does not exist in this group or has been removed.";

/// 密钥验证器
pub struct KeyValidator {
    channel_factory: Arc<ChannelFactory>,
    settings_manager: Arc<SystemSettingsManager>,
    key_store: Arc<KeyStore>,
    parser: KeyParser,
}

impl KeyValidator {
    /// 创建密钥验证器
    #[must_use]
    pub fn new(
        channel_factory: Arc<ChannelFactory>,
        settings_manager: Arc<SystemSettingsManager>,
        key_store: Arc<KeyStore>,
    ) -> Self {
        Self {
            channel_factory,
            settings_manager,
            key_store,
            parser: KeyParser::new(),
        }
    }

    /// 验证单个密钥
    ///
    /// `Ok(())` 表示上游接受该密钥；`Err` 的文本即落库的失败原因。
    /// 除获取渠道失败外，每次调用都恰好记录一次验证结果
    pub async fn validate_single_key(
        &self,
        key: &mut api_keys::Model,
        group: &groups::Model,
    ) -> Result<()> {
        let effective = self.settings_manager.get_effective_config(group);

        self.ensure_parsed(key, group);

        // 无渠道可用时直接返回，没有可记录的验证结果
        let channel = self
            .channel_factory
            .get_channel(group)
            .context(format!("获取分组 {} 的验证渠道失败", group.name))?;

        // 每次调用独享一个超时期限，future 被丢弃即取消远程调用
        let outcome = match tokio::time::timeout(
            effective.key_validation_timeout(),
            channel.validate_key(key, group),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ProxyError::validation(format!(
                "密钥验证超时（{}秒）",
                effective.key_validation_timeout_seconds
            ))),
        };

        let error_message = outcome
            .as_ref()
            .err()
            .map(ToString::to_string)
            .unwrap_or_default();

        // 状态落库对调用方是单向通知，失败只告警不中断
        if let Err(e) = self
            .key_store
            .update_status(key, group, outcome.is_ok(), &error_message)
            .await
        {
            lwarn!(
                "system",
                LogStage::Db,
                LogComponent::KeyValidator,
                "status_update_failed",
                "记录密钥验证结果失败",
                key_id = key.id,
                error = %e
            );
        }

        match &outcome {
            Ok(()) => {
                ldebug!(
                    "system",
                    LogStage::Validation,
                    LogComponent::KeyValidator,
                    "key_validation_ok",
                    "Key validation successful",
                    key_id = key.id
                );
            }
            Err(e) => {
                ldebug!(
                    "system",
                    LogStage::Validation,
                    LogComponent::KeyValidator,
                    "key_validation_failed",
                    "Key validation failed",
                    key_id = key.id,
                    group_id = group.id,
                    error = %e
                );
            }
        }

        outcome
    }

    /// 同步批量验证一组密钥值，结果顺序与输入一致
    ///
    /// 不存在于分组中的密钥值直接得到固定提示，不发起验证；存在性查询
    /// 失败时整个调用失败，不返回部分结果
    pub async fn test_multiple_keys(
        &self,
        group: &groups::Model,
        key_values: &[String],
    ) -> Result<Vec<KeyTestResult>> {
        let existing = self
            .key_store
            .find_keys_by_group_and_values(group.id, key_values)
            .await
            .context("批量查询待验证密钥失败")?;

        let existing_map: HashMap<&str, &api_keys::Model> = existing
            .iter()
            .map(|key| (key.key_value.as_str(), key))
            .collect();

        let mut results = Vec::with_capacity(key_values.len());
        for key_value in key_values {
            let Some(model) = existing_map.get(key_value.as_str()) else {
                results.push(KeyTestResult {
                    key_value: key_value.clone(),
                    is_valid: false,
                    error: KEY_NOT_IN_GROUP.to_string(),
                });
                continue;
            };

            // 逐个验证，每个密钥的超时预算彼此独立
            let mut key = (*model).clone();
            let outcome = self.validate_single_key(&mut key, group).await;

            results.push(KeyTestResult {
                key_value: key_value.clone(),
                is_valid: outcome.is_ok(),
                error: outcome.err().map(|e| e.to_string()).unwrap_or_default(),
            });
        }

        Ok(results)
    }

    /// 确保密钥已解析
    ///
    /// 解析失败不会升级为验证失败：回退为恒等解析并告警，错误的解析
    /// 配置不允许彻底阻断密钥使用
    fn ensure_parsed(&self, key: &mut api_keys::Model, group: &groups::Model) {
        if key.parsed_key.is_some() {
            return;
        }

        let method = KeyParsingMethod::from_config(&group.key_parsing_method);
        match self.parser.parse(&key.key_value, method) {
            Ok(parsed) => key.parsed_key = Some(parsed),
            Err(e) => {
                lwarn!(
                    "system",
                    LogStage::KeyParse,
                    LogComponent::KeyValidator,
                    "key_parse_fallback",
                    "密钥解析失败，回退使用原始密钥",
                    key_id = key.id,
                    group_id = group.id,
                    error = %e
                );
                key.parsed_key = Some(ParsedKey::identity(key.key_value.clone()));
            }
        }
    }
}

impl std::fmt::Debug for KeyValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyValidator")
            .field("channel_factory", &self.channel_factory)
            .field("parser", &self.parser)
            .finish_non_exhaustive()
    }
}
