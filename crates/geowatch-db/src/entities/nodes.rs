use sea_orm::entity::prelude::*;

/// A monitored IP address. Rows are created out-of-band (or by the boot seed) and are
/// never deleted by the daemon.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "nodes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub ip_address: String,
    pub last_seen: Option<DateTimeWithTimeZone>,
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::geo_history::Entity")]
    GeoHistory,
}

impl Related<super::geo_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GeoHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
