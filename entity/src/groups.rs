//! # 密钥分组实体定义
//!
//! 分组表的 Sea-ORM 实体模型，一个分组对应一个上游渠道及其密钥池

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 密钥分组实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    /// 渠道类型 (openai, gemini, anthropic, ...)
    pub channel_type: String,
    /// 上游地址列表，JSON 数组 [{"url": "...", "weight": 1}]
    pub upstreams: Json,
    /// 分组级配置覆盖，JSON 对象
    pub config: Json,
    /// 密钥解析方式 (none, urlencode)
    pub key_parsing_method: String,
    /// 请求头规则，JSON 数组
    pub header_rules: Json,
    pub sort: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::api_keys::Entity")]
    ApiKeys,
}

impl Related<super::api_keys::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApiKeys.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Default for Model {
    fn default() -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: 0,
            name: String::new(),
            channel_type: "openai".to_string(),
            upstreams: Json::Array(vec![]),
            config: Json::Object(serde_json::Map::new()),
            key_parsing_method: "none".to_string(),
            header_rules: Json::Array(vec![]),
            sort: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
