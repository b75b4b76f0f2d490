//! # 密钥验证器集成测试
//!
//! 测试验证流程的完整行为：惰性解析与回退、渠道派发、超时、结果落库、
//! 保序批量验证

use api_keypool::channel::{ChannelFactory, ValidationChannel};
use api_keypool::config::SystemSettingsManager;
use api_keypool::error::ProxyError;
use api_keypool::key_pool::{KeyStore, KeyValidator};
use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::Utc;
use entity::{api_keys, groups};
use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// 记录调用次数的测试渠道，密钥包含 "bad" 时判定为被上游拒绝
#[derive(Debug, Default)]
struct MockChannel {
    calls: AtomicUsize,
}

#[async_trait]
impl ValidationChannel for MockChannel {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn validate_key(
        &self,
        key: &api_keys::Model,
        _group: &groups::Model,
    ) -> api_keypool::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if key.actual_key().contains("bad") {
            return Err(ProxyError::validation("上游拒绝密钥: HTTP 401"));
        }
        Ok(())
    }
}

/// 响应慢于任何验证超时的渠道
#[derive(Debug)]
struct SlowChannel;

#[async_trait]
impl ValidationChannel for SlowChannel {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn validate_key(
        &self,
        _key: &api_keys::Model,
        _group: &groups::Model,
    ) -> api_keypool::Result<()> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}

/// 验证功能测试套件
struct ValidatorTestSuite {
    db: Arc<DatabaseConnection>,
    validator: KeyValidator,
    mock: Arc<MockChannel>,
}

impl ValidatorTestSuite {
    /// 创建测试环境：内存数据库 + 迁移 + 测试渠道
    async fn setup() -> Result<Self, Box<dyn std::error::Error>> {
        let db = Arc::new(sea_orm::Database::connect("sqlite::memory:").await?);
        migration::Migrator::up(db.as_ref(), None).await?;

        let settings_manager = Arc::new(SystemSettingsManager::default());
        let key_store = Arc::new(KeyStore::new(db.clone(), settings_manager.clone()));

        let mock = Arc::new(MockChannel::default());
        let mut channel_factory = ChannelFactory::new();
        channel_factory.register(mock.clone());
        channel_factory.register(Arc::new(SlowChannel));

        let validator = KeyValidator::new(
            Arc::new(channel_factory),
            settings_manager,
            key_store,
        );

        Ok(Self {
            db,
            validator,
            mock,
        })
    }

    /// 插入测试分组
    async fn insert_group(
        &self,
        name: &str,
        channel_type: &str,
        key_parsing_method: &str,
        config: serde_json::Value,
    ) -> Result<groups::Model, Box<dyn std::error::Error>> {
        let now = Utc::now().naive_utc();
        let group = groups::ActiveModel {
            name: Set(name.to_string()),
            channel_type: Set(channel_type.to_string()),
            upstreams: Set(serde_json::json!([{"url": "http://127.0.0.1:9"}])),
            config: Set(config),
            key_parsing_method: Set(key_parsing_method.to_string()),
            header_rules: Set(serde_json::json!([])),
            sort: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        Ok(group.insert(self.db.as_ref()).await?)
    }

    /// 插入测试密钥
    async fn insert_key(
        &self,
        group_id: i32,
        key_value: &str,
    ) -> Result<api_keys::Model, Box<dyn std::error::Error>> {
        let now = Utc::now().naive_utc();
        let key = api_keys::ActiveModel {
            group_id: Set(group_id),
            key_value: Set(key_value.to_string()),
            status: Set("active".to_string()),
            failure_count: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        Ok(key.insert(self.db.as_ref()).await?)
    }

    /// 重新读取密钥行
    async fn fetch_key(&self, id: i32) -> api_keys::Model {
        api_keys::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .expect("查询密钥失败")
            .expect("密钥不存在")
    }
}

#[tokio::test]
async fn test_validate_single_key_records_success() {
    let suite = ValidatorTestSuite::setup().await.unwrap();
    let group = suite
        .insert_group("mock-pool", "mock", "none", serde_json::json!({}))
        .await
        .unwrap();
    let mut key = suite.insert_key(group.id, "sk-good").await.unwrap();

    let outcome = suite.validator.validate_single_key(&mut key, &group).await;
    assert!(outcome.is_ok());

    // 惰性解析已填充
    let parsed = key.parsed_key.as_ref().unwrap();
    assert_eq!(parsed.actual_key, "sk-good");

    let stored = suite.fetch_key(key.id).await;
    assert_eq!(stored.status, "active");
    assert_eq!(stored.failure_count, 0);
    assert_eq!(stored.error_message, None);
    assert!(stored.last_validated_at.is_some());
}

#[tokio::test]
async fn test_validate_single_key_records_failure_reason() {
    let suite = ValidatorTestSuite::setup().await.unwrap();
    let group = suite
        .insert_group("mock-pool", "mock", "none", serde_json::json!({}))
        .await
        .unwrap();
    let mut key = suite.insert_key(group.id, "sk-bad").await.unwrap();

    let outcome = suite.validator.validate_single_key(&mut key, &group).await;
    assert!(outcome.is_err());

    let stored = suite.fetch_key(key.id).await;
    // 首次失败未达拉黑阈值，仍保持 active
    assert_eq!(stored.status, "active");
    assert_eq!(stored.failure_count, 1);
    assert!(stored.error_message.unwrap().contains("上游拒绝密钥"));
}

#[tokio::test]
async fn test_repeated_failures_blacklist_key() {
    let suite = ValidatorTestSuite::setup().await.unwrap();
    let group = suite
        .insert_group(
            "mock-pool",
            "mock",
            "none",
            serde_json::json!({"blacklist_threshold": 2}),
        )
        .await
        .unwrap();
    let key = suite.insert_key(group.id, "sk-bad").await.unwrap();

    for _ in 0..2 {
        // 每轮用最新的行状态验证，失败计数基于落库值累加
        let mut current = suite.fetch_key(key.id).await;
        let _ = suite
            .validator
            .validate_single_key(&mut current, &group)
            .await;
    }

    let stored = suite.fetch_key(key.id).await;
    assert_eq!(stored.failure_count, 2);
    assert_eq!(stored.status, "invalid");
}

#[tokio::test]
async fn test_urlencode_group_validates_with_actual_key() {
    let suite = ValidatorTestSuite::setup().await.unwrap();
    let group = suite
        .insert_group("encoded-pool", "mock", "urlencode", serde_json::json!({}))
        .await
        .unwrap();
    let mut key = suite
        .insert_key(group.id, "key=sk-good&region=us")
        .await
        .unwrap();

    let outcome = suite.validator.validate_single_key(&mut key, &group).await;
    assert!(outcome.is_ok());

    let parsed = key.parsed_key.as_ref().unwrap();
    assert_eq!(parsed.actual_key, "sk-good");
    assert_eq!(parsed.get_param("region"), "us");
}

#[tokio::test]
async fn test_parse_failure_falls_back_to_raw_key() {
    let suite = ValidatorTestSuite::setup().await.unwrap();
    let group = suite
        .insert_group("encoded-pool", "mock", "urlencode", serde_json::json!({}))
        .await
        .unwrap();
    // 解析会失败：首段取值为空，提取不出实际密钥
    let mut key = suite.insert_key(group.id, "token=&x=1").await.unwrap();

    let outcome = suite.validator.validate_single_key(&mut key, &group).await;

    // 解析失败不阻断验证：回退用原始密钥继续
    assert!(outcome.is_ok());
    let parsed = key.parsed_key.as_ref().unwrap();
    assert_eq!(parsed.actual_key, "token=&x=1");
    assert!(parsed.params.is_empty());
}

#[tokio::test]
async fn test_channel_unavailable_skips_status_update() {
    let suite = ValidatorTestSuite::setup().await.unwrap();
    let group = suite
        .insert_group("orphan-pool", "carrier-pigeon", "none", serde_json::json!({}))
        .await
        .unwrap();
    let mut key = suite.insert_key(group.id, "sk-good").await.unwrap();

    let err = suite
        .validator
        .validate_single_key(&mut key, &group)
        .await
        .unwrap_err();

    let (status, code) = err.to_http_response_parts();
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(code, "CHANNEL_UNAVAILABLE");

    // 没有发起验证，也没有状态写入
    assert_eq!(suite.mock.calls.load(Ordering::SeqCst), 0);
    let stored = suite.fetch_key(key.id).await;
    assert!(stored.last_validated_at.is_none());
}

#[tokio::test]
async fn test_validation_timeout_is_recorded_as_failure() {
    let suite = ValidatorTestSuite::setup().await.unwrap();
    let group = suite
        .insert_group(
            "slow-pool",
            "slow",
            "none",
            serde_json::json!({"key_validation_timeout_seconds": 1}),
        )
        .await
        .unwrap();
    let mut key = suite.insert_key(group.id, "sk-good").await.unwrap();

    let err = suite
        .validator
        .validate_single_key(&mut key, &group)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("超时"));

    let stored = suite.fetch_key(key.id).await;
    assert_eq!(stored.failure_count, 1);
    assert!(stored.error_message.unwrap().contains("超时"));
}

#[tokio::test]
async fn test_multiple_keys_preserves_input_order() {
    let suite = ValidatorTestSuite::setup().await.unwrap();
    let group = suite
        .insert_group("mock-pool", "mock", "none", serde_json::json!({}))
        .await
        .unwrap();
    suite.insert_key(group.id, "sk-a").await.unwrap();
    suite.insert_key(group.id, "sk-b").await.unwrap();

    let key_values = vec![
        "sk-a".to_string(),
        "sk-b".to_string(),
        "sk-missing".to_string(),
    ];
    let results = suite
        .validator
        .test_multiple_keys(&group, &key_values)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].key_value, "sk-a");
    assert!(results[0].is_valid);
    assert_eq!(results[0].error, "");
    assert_eq!(results[1].key_value, "sk-b");
    assert!(results[1].is_valid);
    assert_eq!(results[2].key_value, "sk-missing");
    assert!(!results[2].is_valid);
    assert_eq!(
        results[2].error,
        "Key does not exist in this group or has been removed."
    );

    // 不存在的密钥不应触达上游
    assert_eq!(suite.mock.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_multiple_keys_mixes_valid_and_invalid() {
    let suite = ValidatorTestSuite::setup().await.unwrap();
    let group = suite
        .insert_group("mock-pool", "mock", "none", serde_json::json!({}))
        .await
        .unwrap();
    suite.insert_key(group.id, "sk-good").await.unwrap();
    suite.insert_key(group.id, "sk-bad").await.unwrap();

    let key_values = vec!["sk-bad".to_string(), "sk-good".to_string()];
    let results = suite
        .validator
        .test_multiple_keys(&group, &key_values)
        .await
        .unwrap();

    assert!(!results[0].is_valid);
    assert!(results[0].error.contains("上游拒绝密钥"));
    assert!(results[1].is_valid);

    // 批量中单个失败不影响后续密钥继续验证
    assert_eq!(suite.mock.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_keys_from_other_groups_are_not_visible() {
    let suite = ValidatorTestSuite::setup().await.unwrap();
    let group_a = suite
        .insert_group("pool-a", "mock", "none", serde_json::json!({}))
        .await
        .unwrap();
    let group_b = suite
        .insert_group("pool-b", "mock", "none", serde_json::json!({}))
        .await
        .unwrap();
    suite.insert_key(group_b.id, "sk-elsewhere").await.unwrap();

    let results = suite
        .validator
        .test_multiple_keys(&group_a, &["sk-elsewhere".to_string()])
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!(!results[0].is_valid);
    assert_eq!(
        results[0].error,
        "Key does not exist in this group or has been removed."
    );
    assert_eq!(suite.mock.calls.load(Ordering::SeqCst), 0);
}
