use anyhow::Result;
use axum::Router;
use clap::Parser;
use searchcore::Config;
use server::{build_app, rebuild, router, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index directory path (defaults to $RECIPE_INDEX_HOME/index or ~/.recipe-index/index)
    #[arg(long)]
    index: Option<PathBuf>,
    /// Document directory; when given, the index is rebuilt from it before serving
    #[arg(long)]
    root: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = Config::new(args.root, args.index);

    let app: Router = if config.doc_root.is_some() {
        let cfg = config.clone();
        let sealed = tokio::task::spawn_blocking(move || rebuild(&cfg)).await??;
        router(AppState::new(config, sealed, std::env::var("ADMIN_TOKEN").ok()))
    } else {
        build_app(config)?
    };

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
