pub use sea_orm;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};

pub mod entities;

/// Opens the store. Accepts `postgres://` and `sqlite://` urls.
///
/// Per-statement sqlx logging is off; the daemon logs at the operation level instead.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, sea_orm::DbErr> {
    let mut opts = ConnectOptions::new(database_url);
    opts.sqlx_logging(false);
    Database::connect(opts).await
}
