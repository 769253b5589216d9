use std::net::SocketAddr;

use agency_backoffice::{
    config::Config, database::sqlite::SqliteStore, server::server::Server,
    session::gate::SessionGate, timing::schedule::Schedule,
};
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            error!("Configuration error: {}", err);
            std::process::exit(1);
        }
    };

    let store = match SqliteStore::open(&config.database_path) {
        Ok(store) => store,
        Err(err) => {
            error!("Could not open {}: {}", config.database_path, err);
            std::process::exit(1);
        }
    };

    let schedule = Schedule::standard().with_interval(config.slot_step_minutes);
    let gate = SessionGate::new(config.admin.clone(), store);
    let server = Server::setup(gate, schedule, config.timezone);

    let address = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = match TcpListener::bind(address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Could not bind {}: {}", address, err);
            std::process::exit(1);
        }
    };
    info!("Listening on {}", address);

    loop {
        let (stream, _) = match listener.accept().await {
            Ok(connection) => connection,
            Err(err) => {
                error!("Could not accept connection: {}", err);
                continue;
            }
        };
        let io = TokioIo::new(stream);
        let server_clone = server.clone();
        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(io, server_clone)
                .await
            {
                error!("{}", err);
            }
        });
    }
}
