//! xiaoya-teacher-mcp server binary
//!
//! Serves stdio, plus SSE and/or Streamable HTTP when `MCP_TRANSPORT`
//! asks for them.

use std::sync::Arc;

use clap::Parser;
use tower_mcp::StdioTransport;

use xiaoya_teacher_mcp::transport::{self, RouterFactory};
use xiaoya_teacher_mcp::{AppState, Args, Settings, build_router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // stdout carries the stdio transport
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("xiaoya_teacher_mcp={}", args.log_level).parse()?)
                .add_directive(format!("tower_mcp={}", args.log_level).parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_args(&args);
    tracing::info!(
        transports = ?settings.enabled_transports(),
        api_base = %settings.urls.api,
        "Starting xiaoya-teacher-mcp (stdio authentication is initialized lazily)"
    );

    let state = Arc::new(AppState::new(settings.clone())?);
    let router = build_router(&state)?;

    let http = if settings.has_network_transports() {
        let factory: RouterFactory = {
            let state = state.clone();
            Arc::new(move || build_router(&state))
        };
        let auth = state.auth().clone();
        let settings = settings.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = transport::serve(&settings, factory, auth).await {
                tracing::error!(error = %e, "HTTP server stopped");
            }
        }))
    } else {
        None
    };

    StdioTransport::new(router).run().await?;

    if let Some(http) = http {
        tracing::info!("stdio closed; HTTP transports keep running until interrupted");
        tokio::select! {
            _ = http => {}
            _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted, shutting down"),
        }
    }

    Ok(())
}
