//! # 数据库模块
//!
//! 数据库连接和迁移管理

use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, linfo};
use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::path::Path;

/// 初始化数据库连接
///
/// 对于SQLite数据库，确保数据库文件的目录和文件存在
pub async fn init_database(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "connect_db",
        &format!("正在连接数据库: {database_url}")
    );

    if database_url.starts_with("sqlite:") && !database_url.contains(":memory:") {
        let db_path = database_url
            .strip_prefix("sqlite://")
            .unwrap_or(database_url.strip_prefix("sqlite:").unwrap_or(database_url));
        let db_file_path = Path::new(db_path);

        if let Some(parent_dir) = db_file_path.parent()
            && !parent_dir.exists()
        {
            std::fs::create_dir_all(parent_dir).map_err(|e| {
                DbErr::Custom(format!("无法创建数据库目录 {}: {}", parent_dir.display(), e))
            })?;
            linfo!(
                "system",
                LogStage::Startup,
                LogComponent::Database,
                "create_db_dir",
                &format!("数据库目录创建成功: {}", parent_dir.display())
            );
        }

        if !db_file_path.exists() {
            std::fs::File::create(db_file_path).map_err(|e| {
                DbErr::Custom(format!(
                    "无法创建数据库文件 {}: {}",
                    db_file_path.display(),
                    e
                ))
            })?;
            ldebug!(
                "system",
                LogStage::Startup,
                LogComponent::Database,
                "create_db_file",
                &format!("数据库文件创建成功: {}", db_file_path.display())
            );
        }
    }

    let db = Database::connect(database_url).await?;

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "db_connected",
        "数据库连接成功"
    );
    Ok(db)
}

/// 执行数据库迁移
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    migration::Migrator::up(db, None).await?;
    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "migrations_done",
        "数据库迁移完成"
    );
    Ok(())
}
