// main.rs
// Starts the propledger JSON API: loads .env, connects to MongoDB (seeding an
// empty database), and serves the router on BIND_ADDR.

use std::{net::SocketAddr, sync::Arc};

use dotenvy::dotenv;
use tokio::net::TcpListener;

use propledger::{routes, state};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "propledger=info,tower_http=info".into()),
        )
        .init();

    let state = Arc::new(state::init_state().await?);
    let addr = state.settings.bind_addr.parse::<SocketAddr>()?;
    let app = routes::router(state);

    tracing::info!("Listening on http://{addr}");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
