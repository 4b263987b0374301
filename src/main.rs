// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Relay server binary: configuration, logging, state wiring, serve loop.

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = nirso_config::load_config(None)?;
    nirso_config::validate_config(&config)?;

    let state = nirso_api::ApiState::from_config(&config);
    tracing::info!(
        "🚀 Relay starting - inference endpoint {}",
        state.relay.endpoint()
    );

    let app = nirso_api::create_http_server(state);

    let bind_address = format!("{}:{}", config.api.host, config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening http://{}", bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
