use migration::{Migrator, MigratorTrait};
use salvo::Service;
use salvo::http::header::{HeaderValue, SET_COOKIE};
use salvo::test::TestClient;
use sea_orm::{ConnectOptions, Database};
use tera::Tera;

use crate::config::Config;
use crate::routes;
use crate::state::AppState;

const TEST_SECRET: &str =
    "secretabsecretabsecretabsecretabsecretabsecretabsecretabsecretab";

pub(crate) async fn test_state() -> AppState {
    // One pooled connection, so every request sees the same in-memory
    // database as the migration that set it up.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    let conn = Database::connect(options).await.expect("test database");
    Migrator::up(&conn, None).await.expect("migrations");
    let templates = Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*"))
        .expect("templates");
    AppState { conn, templates }
}

/// Service over a fresh in-memory database, plus the state backing it so
/// tests can inspect rows directly.
pub(crate) async fn test_service() -> (Service, AppState) {
    let state = test_state().await;
    let config = Config {
        listen_addr: "127.0.0.1:0".to_owned(),
        database_url: "sqlite::memory:".to_owned(),
        session_secret: TEST_SECRET.to_owned(),
    };
    (routes::service(state.clone(), &config), state)
}

pub(crate) async fn register(service: &Service, email: &str, name: &str, password: &str) {
    TestClient::post("http://127.0.0.1:5800/register")
        .raw_form(format!("email={email}&name={name}&password={password}"))
        .send(service)
        .await;
}

/// Logs in and returns the session cookie for follow-up requests.
pub(crate) async fn login(service: &Service, email: &str, password: &str) -> HeaderValue {
    let response = TestClient::post("http://127.0.0.1:5800/login")
        .raw_form(format!("email={email}&password={password}"))
        .send(service)
        .await;
    response
        .headers()
        .get(SET_COOKIE)
        .expect("session cookie")
        .clone()
}

/// Registers the first account (which becomes the admin) and logs it in.
pub(crate) async fn admin_cookie(service: &Service) -> HeaderValue {
    register(service, "admin@example.com", "Admin", "hunter2pass").await;
    login(service, "admin@example.com", "hunter2pass").await
}
