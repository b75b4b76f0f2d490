//! # API密钥实体定义
//!
//! 分组密钥池中单个密钥的 Sea-ORM 实体模型

use crate::parsed_key::ParsedKey;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// API密钥实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "api_keys")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub group_id: i32,
    /// 操作员录入的原始密钥字符串
    pub key_value: String,
    /// 密钥状态 (active, invalid)
    pub status: String,
    /// 连续验证失败次数
    pub failure_count: i32,
    pub error_message: Option<String>,
    pub last_validated_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    /// 运行时解析结果，按需填充，不落库
    #[sea_orm(ignore)]
    #[serde(skip)]
    pub parsed_key: Option<ParsedKey>,
}

impl Model {
    /// 实际提交给上游服务的凭证；未解析时回退到原始密钥
    #[must_use]
    pub fn actual_key(&self) -> &str {
        self.parsed_key
            .as_ref()
            .map_or(self.key_value.as_str(), |parsed| parsed.actual_key.as_str())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Group,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Default for Model {
    fn default() -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: 0,
            group_id: 0,
            key_value: String::new(),
            status: "active".to_string(),
            failure_count: 0,
            error_message: None,
            last_validated_at: None,
            created_at: now,
            updated_at: now,
            parsed_key: None,
        }
    }
}
