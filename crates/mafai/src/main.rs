//! Mafai - MCP game server binary

use anyhow::Result;
use clap::Parser;
use mafai::cli::{Cli, Command};
use mafai::{GameService, MafaiServer, ServerConfig};
use rmcp::ServiceExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Server => {
            init_tracing("info,mafai=debug", true);
            let config = ServerConfig::load_or_default(&cli.config)?;
            run_mcp_server(config).await
        }
        Command::Http { host, port } => {
            init_tracing("info,mafai=debug,rmcp=debug", false);
            let mut config = ServerConfig::load_or_default(&cli.config)?;
            if host.is_some() || port.is_some() {
                let host = host.unwrap_or_else(|| config.bind_host().clone());
                let port = port.unwrap_or(*config.port());
                config = config.with_bind(host, port);
            }
            run_http_server(config).await
        }
    }
}

/// Stdout carries the protocol in stdio mode, so logs go to stderr there.
fn init_tracing(default_filter: &str, stderr: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if stderr {
        builder.with_writer(std::io::stderr).init();
    } else {
        builder.init();
    }
}

/// Run the MCP game server (stdio mode)
async fn run_mcp_server(config: ServerConfig) -> Result<()> {
    info!("Starting Mafai MCP server");

    let server = MafaiServer::with_service(GameService::from_config(&config));

    info!("Server ready - connect via MCP protocol");
    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;

    Ok(())
}

/// Run the HTTP game server
async fn run_http_server(config: ServerConfig) -> Result<()> {
    use axum::{Router, body::Body, http::Request};
    use rmcp::transport::streamable_http_server::{
        session::local::LocalSessionManager,
        tower::{StreamableHttpServerConfig, StreamableHttpService},
    };
    use std::sync::Arc;
    use tower::ServiceBuilder;
    use tracing::debug;

    info!(
        host = %config.bind_host(),
        port = config.port(),
        "Starting Mafai MCP server on HTTP"
    );

    // One game service shared by every MCP connection
    let game_service = GameService::from_config(&config);

    let http_service = StreamableHttpService::new(
        move || {
            debug!("Creating MafaiServer instance over shared service");
            Ok(MafaiServer::with_service(game_service.clone()))
        },
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig::default(),
    );

    let app = Router::new().fallback_service(
        ServiceBuilder::new()
            .map_request(|req: Request<Body>| {
                debug!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
                req
            })
            .service(tower::service_fn(move |req: Request<Body>| {
                let mut service = http_service.clone();
                async move {
                    let uri = req.uri().clone();
                    let result = tower::Service::call(&mut service, req).await;
                    match &result {
                        Ok(resp) => debug!(status = ?resp.status(), uri = %uri, "Response sent"),
                        Err(e) => warn!(error = ?e, uri = %uri, "Request failed"),
                    }
                    result
                }
            })),
    );

    let listener =
        tokio::net::TcpListener::bind((config.bind_host().as_str(), *config.port())).await?;
    info!("Server ready at http://{}:{}/", config.bind_host(), config.port());
    axum::serve(listener, app).await?;

    Ok(())
}
