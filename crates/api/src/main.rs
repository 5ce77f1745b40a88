use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use partybook_api::config::ApiConfig;
use partybook_infra::{PostgresStore, Repositories, SeedContext, SeedRunner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    partybook_observability::init();

    let config = ApiConfig::from_env()?;

    let repositories = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .context("failed to connect to DATABASE_URL")?;
            let store = PostgresStore::new(pool);
            store.migrate().await.context("failed to apply schema")?;
            info!("using postgres store");
            Repositories::from_store(Arc::new(store))
        }
        None => {
            info!("DATABASE_URL not set; using in-memory store");
            Repositories::in_memory()
        }
    };

    if config.seed {
        let ctx = SeedContext::new(repositories.clone(), config.members_file.clone());
        let summary = SeedRunner::with_defaults().run(&ctx).await;
        if summary.is_complete() {
            info!(loaders = summary.completed.len(), "seed data loaded");
        } else {
            warn!(failed = ?summary.failed, "seed data partially loaded");
        }
    }

    let app = partybook_api::app::build_app(&config, repositories);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
