//! Vendas ERP - service entry point.

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vendas_erp::routes;
use vendas_erp::service::OrderService;
use vendas_erp::store::postgres::PgStore;
use vendas_erp::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&std::env::var("DATABASE_URL")?)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match std::env::var("NATS_URL") {
        Ok(url) => match async_nats::connect(&url).await {
            Ok(client) => {
                info!("connected to NATS, order events enabled");
                Some(client)
            }
            Err(err) => {
                warn!(%err, "NATS connection failed, order events disabled");
                None
            }
        },
        Err(_) => None,
    };

    let store = Arc::new(PgStore::new(db.clone()));
    let orders = OrderService::new(store.clone(), store.clone(), store.clone(), nats);
    let state = AppState {
        db,
        stock: store,
        orders,
    };

    let app = routes::api_router()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    info!("vendas-erp listening on 0.0.0.0:{port}");
    axum::serve(
        tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?,
        app,
    )
    .await?;
    Ok(())
}
