//! Create api_key_usage table migration

use sea_orm_migration::prelude::*;

use super::m20240101_000002_create_api_keys::ApiKeys;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ApiKeyUsage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApiKeyUsage::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ApiKeyUsage::ApiKeyId).integer().not_null())
                    .col(ColumnDef::new(ApiKeyUsage::Endpoint).string_len(2048).not_null())
                    .col(
                        ColumnDef::new(ApiKeyUsage::RequestTimestamp)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_api_key_usage_api_key_id")
                            .from(ApiKeyUsage::Table, ApiKeyUsage::ApiKeyId)
                            .to(ApiKeys::Table, ApiKeys::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_api_key_usage_api_key_id")
                    .table(ApiKeyUsage::Table)
                    .col(ApiKeyUsage::ApiKeyId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_api_key_usage_request_timestamp")
                    .table(ApiKeyUsage::Table)
                    .col(ApiKeyUsage::RequestTimestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApiKeyUsage::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ApiKeyUsage {
    Table,
    Id,
    ApiKeyId,
    Endpoint,
    RequestTimestamp,
}
