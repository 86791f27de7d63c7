use chrono::{DateTime, FixedOffset};
use geowatch_db::entities::{geo_history, nodes};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;

use crate::geo_client::GeoData;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("node {0} does not exist")]
    NodeNotFound(i32),
}

/// Poll target handed to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveNode {
    pub id: i32,
    pub ip: String,
}

/// Sole owner of the `nodes` / `geo_history` schema.
pub struct Store {
    db: DatabaseConnection,
}

impl Store {
    /// Connects and applies migrations (idempotent). Failure here must stop the process.
    pub async fn initialize(database_url: &str) -> Result<Self, StoreError> {
        let db = geowatch_db::connect(database_url).await?;
        geowatch_migration::Migrator::up(&db, None).await?;
        Ok(Self { db })
    }

    /// Active nodes only. A read error degrades to an empty poll set for this cycle.
    pub async fn list_active_nodes(&self) -> Vec<ActiveNode> {
        let rows = nodes::Entity::find()
            .filter(nodes::Column::IsActive.eq(true))
            .order_by_asc(nodes::Column::Id)
            .all(&self.db)
            .await;

        match rows {
            Ok(rows) => rows
                .into_iter()
                .map(|n| ActiveNode {
                    id: n.id,
                    ip: n.ip_address,
                })
                .collect(),
            Err(err) => {
                tracing::error!(%err, "failed to list active nodes");
                Vec::new()
            }
        }
    }

    /// Appends one observation and advances the node's `last_seen` to the same instant.
    /// Both writes commit together or not at all.
    pub async fn record_observation(
        &self,
        node_id: i32,
        geo: &GeoData,
        check_time: DateTime<FixedOffset>,
    ) -> Result<i32, StoreError> {
        let txn = self.db.begin().await?;

        let touched = nodes::Entity::update_many()
            .col_expr(nodes::Column::LastSeen, Expr::value(Some(check_time)))
            .filter(nodes::Column::Id.eq(node_id))
            .exec(&txn)
            .await?;
        if touched.rows_affected == 0 {
            txn.rollback().await?;
            return Err(StoreError::NodeNotFound(node_id));
        }

        let row = geo_history::ActiveModel {
            node_id: Set(node_id),
            check_time: Set(check_time),
            country: Set(geo.country.clone()),
            city: Set(geo.city.clone()),
            isp: Set(geo.isp.clone()),
            latitude: Set(geo.latitude),
            longitude: Set(geo.longitude),
            raw_response: Set(geo.raw.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(row.id)
    }

    pub async fn add_node(&self, ip: &str, active: bool) -> Result<i32, StoreError> {
        let node = nodes::ActiveModel {
            ip_address: Set(ip.trim().to_string()),
            last_seen: Set(None),
            is_active: Set(active),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        Ok(node.id)
    }

    /// Inserts `ip` as an active node when the node table is empty.
    /// Returns whether a node was created.
    pub async fn seed_default_node(&self, ip: &str) -> Result<bool, StoreError> {
        if nodes::Entity::find().count(&self.db).await? > 0 {
            return Ok(false);
        }
        self.add_node(ip, true).await?;
        Ok(true)
    }

    pub async fn find_node(&self, node_id: i32) -> Result<Option<nodes::Model>, StoreError> {
        Ok(nodes::Entity::find_by_id(node_id).one(&self.db).await?)
    }

    pub async fn history_for_node(
        &self,
        node_id: i32,
    ) -> Result<Vec<geo_history::Model>, StoreError> {
        Ok(geo_history::Entity::find()
            .filter(geo_history::Column::NodeId.eq(node_id))
            .order_by_asc(geo_history::Column::CheckTime)
            .order_by_asc(geo_history::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Releases the pool. Consumes the store so it cannot be closed twice.
    pub async fn close(self) -> Result<(), StoreError> {
        self.db.close().await?;
        Ok(())
    }
}
