//! # 密钥存储
//!
//! 密钥池的持久层访问：批量存在性查询与验证结果落库

use crate::config::SystemSettingsManager;
use crate::error::{Context, ProxyError, Result};
use crate::key_pool::types::KeyStatus;
use crate::ldebug;
use crate::logging::{LogComponent, LogStage};
use chrono::Utc;
use entity::{api_keys, groups};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;

/// 密钥存储服务
pub struct KeyStore {
    db: Arc<DatabaseConnection>,
    settings_manager: Arc<SystemSettingsManager>,
}

impl KeyStore {
    /// 创建密钥存储服务
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, settings_manager: Arc<SystemSettingsManager>) -> Self {
        Self {
            db,
            settings_manager,
        }
    }

    /// 批量查询分组下存在的密钥记录
    pub async fn find_keys_by_group_and_values(
        &self,
        group_id: i32,
        values: &[String],
    ) -> Result<Vec<api_keys::Model>> {
        api_keys::Entity::find()
            .filter(api_keys::Column::GroupId.eq(group_id))
            .filter(api_keys::Column::KeyValue.is_in(values.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| ProxyError::database_with_source("批量查询分组密钥失败", e))
    }

    /// 记录一次验证结果
    ///
    /// 验证通过时清零失败计数并恢复 active 状态；失败时累加计数，达到分组
    /// 的拉黑阈值后将密钥置为 invalid。每次验证尝试恰好写入一次
    pub async fn update_status(
        &self,
        key: &api_keys::Model,
        group: &groups::Model,
        is_valid: bool,
        error_message: &str,
    ) -> Result<()> {
        let now = Utc::now().naive_utc();
        let mut model: api_keys::ActiveModel = key.clone().into();

        if is_valid {
            model.status = Set(KeyStatus::Active.to_string());
            model.failure_count = Set(0);
            model.error_message = Set(None);
        } else {
            let failures = key.failure_count.saturating_add(1);
            model.failure_count = Set(failures);
            model.error_message = Set(Some(error_message.to_string()));

            let effective = self.settings_manager.get_effective_config(group);
            if failures >= effective.blacklist_threshold {
                model.status = Set(KeyStatus::Invalid.to_string());
            }
        }

        model.last_validated_at = Set(Some(now));
        model.updated_at = Set(now);

        model
            .update(self.db.as_ref())
            .await
            .context(format!("更新密钥状态失败，ID: {}", key.id))?;

        ldebug!(
            "system",
            LogStage::Db,
            LogComponent::KeyStore,
            "key_status_updated",
            "Key validation outcome recorded",
            key_id = key.id,
            group_id = group.id,
            is_valid = is_valid
        );

        Ok(())
    }
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("db", &"<Arc<DatabaseConnection>>")
            .finish_non_exhaustive()
    }
}
