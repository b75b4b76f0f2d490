use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_groups_table::Groups;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ApiKeys::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApiKeys::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ApiKeys::GroupId).integer().not_null())
                    .col(
                        ColumnDef::new(ApiKeys::KeyValue)
                            .string_len(1024)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ApiKeys::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(ApiKeys::FailureCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ApiKeys::ErrorMessage).text().null())
                    .col(ColumnDef::new(ApiKeys::LastValidatedAt).timestamp().null())
                    .col(
                        ColumnDef::new(ApiKeys::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ApiKeys::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_api_keys_group_id")
                            .from(ApiKeys::Table, ApiKeys::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 同组内密钥值唯一，批量存在性查询依赖该约束
        manager
            .create_index(
                Index::create()
                    .name("idx_api_keys_unique_group_value")
                    .table(ApiKeys::Table)
                    .col(ApiKeys::GroupId)
                    .col(ApiKeys::KeyValue)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_api_keys_group_status")
                    .table(ApiKeys::Table)
                    .col(ApiKeys::GroupId)
                    .col(ApiKeys::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApiKeys::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ApiKeys {
    Table,
    Id,
    GroupId,
    KeyValue,
    Status,
    FailureCount,
    ErrorMessage,
    LastValidatedAt,
    CreatedAt,
    UpdatedAt,
}
