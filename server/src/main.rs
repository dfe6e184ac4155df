use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

mod error;
mod handlers;
mod logic;
mod state;
mod storage;

use crate::handlers::api_router;
use crate::logic::{ResignPolicy, SigningService};
use crate::state::AppState;
use crate::storage::{FileStorage, Storage};

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON document holding both parties' signatures.
    #[arg(long)]
    state_file: Option<PathBuf>,
    #[arg(long)]
    public_dir: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = ResignPolicy::Overwrite)]
    resign_policy: ResignPolicy,
    /// Re-initialize the state file, moving a corrupt one aside, then exit.
    #[arg(long)]
    reset: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,twosign_server=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let args = Args::parse();

    let state_file = args
        .state_file
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../data/db.json"));
    let storage = Arc::new(FileStorage::new(state_file));

    if args.reset {
        match storage.reset().await {
            Ok(state) => {
                tracing::info!(created_date = %state.created_date, "Agreement state reset");
                return;
            }
            Err(error) => {
                tracing::error!(%error, "Failed to reset agreement state");
                std::process::exit(1);
            }
        }
    }

    match storage.load().await {
        Ok(state) => tracing::info!(
            path = %storage.path().display(),
            party_a_signed = state.party_a.is_some(),
            party_b_signed = state.party_b.is_some(),
            "Agreement state ready"
        ),
        Err(error) => tracing::error!(
            %error,
            "Agreement state unavailable; requests will fail until it is repaired or --reset is run"
        ),
    }

    let public_dir = args
        .public_dir
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../public"));

    let state = AppState::new(SigningService::new(storage, args.resign_policy));
    let app = api_router(state)
        .fallback_service(ServeDir::new(public_dir).append_index_html_on_directories(true))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Signing board running at http://localhost:{port}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind server");
    axum::serve(listener, app).await.expect("Server crashed");
}
