#![forbid(unsafe_code)]

use std::net::SocketAddr;

use atrium_server::{build_router, init_tracing, AppConfig};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let database_url = std::env::var("ATRIUM_DATABASE_URL").ok();
    if database_url.is_none() {
        tracing::warn!("ATRIUM_DATABASE_URL unset; using an empty in-memory directory");
    }
    let encoded_key = std::env::var("ATRIUM_TOKEN_KEY")
        .map_err(|_| anyhow::anyhow!("ATRIUM_TOKEN_KEY is required for runtime"))?;
    let token_key: [u8; 32] = URL_SAFE_NO_PAD
        .decode(encoded_key.trim())
        .map_err(|e| anyhow::anyhow!("invalid ATRIUM_TOKEN_KEY encoding: {e}"))?
        .try_into()
        .map_err(|bytes: Vec<u8>| {
            anyhow::anyhow!("ATRIUM_TOKEN_KEY must decode to 32 bytes, got {}", bytes.len())
        })?;
    let history_limit_max = std::env::var("ATRIUM_HISTORY_LIMIT_MAX").map_or_else(
        |_| Ok(AppConfig::default().history_limit_max),
        |value| {
            value
                .parse::<usize>()
                .map_err(|e| anyhow::anyhow!("invalid ATRIUM_HISTORY_LIMIT_MAX value {value:?}: {e}"))
        },
    )?;
    let app_config = AppConfig {
        token_key: Some(token_key),
        database_url,
        history_limit_max,
        ..AppConfig::default()
    };
    let app = build_router(&app_config)?;
    let addr = std::env::var("ATRIUM_BIND_ADDR")
        .unwrap_or_else(|_| String::from("0.0.0.0:3000"))
        .parse::<SocketAddr>()
        .map_err(|e| anyhow::anyhow!("invalid ATRIUM_BIND_ADDR: {e}"))?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "atrium-server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
