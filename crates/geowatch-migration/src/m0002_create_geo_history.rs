use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GeoHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GeoHistory::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GeoHistory::NodeId).integer().not_null())
                    .col(
                        ColumnDef::new(GeoHistory::CheckTime)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(GeoHistory::Country).text().null())
                    .col(ColumnDef::new(GeoHistory::City).text().null())
                    .col(ColumnDef::new(GeoHistory::Isp).text().null())
                    .col(ColumnDef::new(GeoHistory::Latitude).double().null())
                    .col(ColumnDef::new(GeoHistory::Longitude).double().null())
                    .col(
                        ColumnDef::new(GeoHistory::RawResponse)
                            .json_binary()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_geo_history_node")
                            .from(GeoHistory::Table, GeoHistory::NodeId)
                            .to(Nodes::Table, Nodes::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Non-unique indexes cannot ride along in CREATE TABLE on Postgres.
        manager
            .create_index(
                Index::create()
                    .name("idx_geo_history_node_id_check_time")
                    .table(GeoHistory::Table)
                    .col(GeoHistory::NodeId)
                    .col(GeoHistory::CheckTime)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_geo_history_node_id_check_time")
                    .table(GeoHistory::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(GeoHistory::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Nodes {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum GeoHistory {
    Table,
    Id,
    NodeId,
    CheckTime,
    Country,
    City,
    Isp,
    Latitude,
    Longitude,
    RawResponse,
}
