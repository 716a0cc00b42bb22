use migration::{Migrator, MigratorTrait};
use salvo::prelude::*;
use tera::Tera;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::Config;
use crate::state::AppState;

mod auth;
mod config;
mod error;
mod forms;
mod pagination;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::from_env();

    info!("connecting to {}", config.database_url);
    let conn = sea_orm::Database::connect(&config.database_url)
        .await
        .expect("database connection");
    Migrator::up(&conn, None).await.expect("schema migration");

    let templates = Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*"))
        .expect("templates");
    let state = AppState { conn, templates };
    let service = routes::service(state, &config);

    let acceptor = TcpListener::new(config.listen_addr.as_str()).bind().await;
    info!("listening on {}", config.listen_addr);
    Server::new(acceptor).serve(service).await;
}
