//! # 系统配置管理
//!
//! 系统级默认配置、分组级覆盖以及两者合并后的有效配置。
//! 有效配置按分组惰性计算并缓存，推导本身是纯函数，并发重算是安全的。

use crate::logging::{LogComponent, LogStage};
use crate::lwarn;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// 系统默认配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
    /// 服务对外地址
    pub app_url: String,
    /// 单次密钥验证的超时时间（秒）
    pub key_validation_timeout_seconds: u64,
    /// 连续验证失败多少次后将密钥置为无效
    pub blacklist_threshold: i32,
    /// 代理请求超时时间（秒）
    pub request_timeout_seconds: u64,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            app_url: "http://localhost:3001".to_string(),
            key_validation_timeout_seconds: 20,
            blacklist_threshold: 3,
            request_timeout_seconds: 600,
        }
    }
}

/// 分组级配置覆盖，全部字段可选，缺省继承系统默认值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfigOverride {
    pub key_validation_timeout_seconds: Option<u64>,
    pub blacklist_threshold: Option<i32>,
    pub request_timeout_seconds: Option<u64>,
}

/// 合并后的有效配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub app_url: String,
    pub key_validation_timeout_seconds: u64,
    pub blacklist_threshold: i32,
    pub request_timeout_seconds: u64,
}

impl EffectiveConfig {
    /// 密钥验证超时时间
    #[must_use]
    pub const fn key_validation_timeout(&self) -> Duration {
        Duration::from_secs(self.key_validation_timeout_seconds)
    }
}

/// 系统配置管理器
///
/// 持有系统默认值，按分组缓存合并结果
#[derive(Debug)]
pub struct SystemSettingsManager {
    defaults: SystemSettings,
    cache: DashMap<i32, Arc<EffectiveConfig>>,
}

impl SystemSettingsManager {
    /// 使用给定的系统默认值创建管理器
    #[must_use]
    pub fn new(defaults: SystemSettings) -> Self {
        Self {
            defaults,
            cache: DashMap::new(),
        }
    }

    /// 获取分组的有效配置（按分组ID缓存，不存在时计算）
    pub fn get_effective_config(&self, group: &entity::groups::Model) -> Arc<EffectiveConfig> {
        if let Some(hit) = self.cache.get(&group.id) {
            return hit.value().clone();
        }

        let effective = Arc::new(self.resolve(group));
        self.cache.insert(group.id, effective.clone());
        effective
    }

    /// 分组配置变更后失效对应缓存条目
    pub fn invalidate(&self, group_id: i32) {
        self.cache.remove(&group_id);
    }

    /// 合并系统默认值与分组覆盖，纯函数
    fn resolve(&self, group: &entity::groups::Model) -> EffectiveConfig {
        let overrides: GroupConfigOverride = serde_json::from_value(group.config.clone())
            .unwrap_or_else(|e| {
                lwarn!(
                    "system",
                    LogStage::Config,
                    LogComponent::SettingsManager,
                    "bad_group_config",
                    "分组配置反序列化失败，使用系统默认值",
                    group_id = group.id,
                    error = %e
                );
                GroupConfigOverride::default()
            });

        EffectiveConfig {
            app_url: self.defaults.app_url.clone(),
            key_validation_timeout_seconds: overrides
                .key_validation_timeout_seconds
                .unwrap_or(self.defaults.key_validation_timeout_seconds),
            blacklist_threshold: overrides
                .blacklist_threshold
                .unwrap_or(self.defaults.blacklist_threshold),
            request_timeout_seconds: overrides
                .request_timeout_seconds
                .unwrap_or(self.defaults.request_timeout_seconds),
        }
    }
}

impl Default for SystemSettingsManager {
    fn default() -> Self {
        Self::new(SystemSettings::default())
    }
}
