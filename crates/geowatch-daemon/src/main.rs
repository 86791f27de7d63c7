use anyhow::Context;
use geowatch_daemon::config::Config;
use geowatch_daemon::geo_client::IpApiClient;
use geowatch_daemon::scheduler::{Pacing, Scheduler};
use geowatch_daemon::shutdown::{self, Shutdown};
use geowatch_daemon::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let _log_guard = geowatch_daemon::logging::init(config.log_file.as_deref())?;

    // Migrations run on boot; an unreachable store is the one fatal error.
    let store = Store::initialize(&config.database_url)
        .await
        .context("initialize store")?;

    if let Some(ip) = config.seed_ip.as_deref() {
        match store.seed_default_node(ip).await {
            Ok(true) => tracing::info!(ip, "seeded empty node table"),
            Ok(false) => {}
            Err(err) => tracing::warn!(%err, ip, "failed to seed node table"),
        }
    }

    let client = IpApiClient::new(config.api_url.clone(), config.lookup_timeout)
        .context("build geolocation http client")?;

    let shutdown = Shutdown::new();
    shutdown::listen_for_signals(shutdown.clone());

    let pacing = Pacing {
        check_interval: config.check_interval,
        node_delay: config.pacing_delay,
    };
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        lookup_timeout_secs = config.lookup_timeout.as_secs(),
        "geowatch starting"
    );

    let state = Scheduler::new(store, client, shutdown, pacing).run().await;
    tracing::info!(?state, "geowatch exited");

    Ok(())
}
