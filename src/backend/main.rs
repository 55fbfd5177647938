/**
 * XFCollab Relay Entry Point
 *
 * This is the main entry point for the XFCollab relay server.
 * It loads the relay configuration and serves the WebSocket relay.
 */

#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use xfcollab::backend::server::{create_app, RelayConfig};

    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!("[STARTUP] Relay initialization started");

    let config = RelayConfig::from_env()?;
    let addr = config.addr;
    let app = create_app(config);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("[STARTUP] Listening on {}", addr);
    tracing::info!("[STARTUP] Clients should connect to ws://{}/ws?token=<jwt>", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(not(feature = "ssr"))]
fn main() {
    eprintln!("The relay requires the 'ssr' feature to be enabled.");
    eprintln!("Run with: cargo run --bin xfcollab-relay --features ssr");
    std::process::exit(1);
}
