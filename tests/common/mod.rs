use pqrs_portal::{
    AppConfig, AppState, InMemorySessionStore, MemoryRepository, RepositoryState, SessionState,
    config::Env, create_router,
};
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct TestApp {
    pub address: String,
}

/// Spawns the full router on an ephemeral port, backed by the seeded in-memory
/// repository (one well-known identity per role) and a fresh session store.
pub async fn spawn_app() -> TestApp {
    spawn_app_with_env(Env::Local).await
}

/// Same as `spawn_app`, but with an explicit runtime environment, so the
/// environment-gated behavior (the x-user-id dev bypass) can be tested on
/// both sides of the switch.
pub async fn spawn_app_with_env(env: Env) -> TestApp {
    let repo = Arc::new(MemoryRepository::seeded()) as RepositoryState;
    let sessions = Arc::new(InMemorySessionStore::new()) as SessionState;
    let config = AppConfig {
        env,
        ..AppConfig::default()
    };

    let state = AppState {
        repo,
        sessions,
        config,
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address }
}

/// Client that does NOT follow redirects, so the guard's redirect decisions
/// can be asserted directly.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Logs in against the seeded identities and returns the response body.
pub async fn login(
    client: &reqwest::Client,
    address: &str,
    nickname: &str,
    password: &str,
) -> serde_json::Value {
    let response = client
        .post(format!("{}/auth/login", address))
        .json(&serde_json::json!({ "nickname": nickname, "password": password }))
        .send()
        .await
        .expect("login request failed");
    assert_eq!(response.status(), 200, "login should succeed");
    response.json().await.unwrap()
}

/// Convenience: login and return just the bearer token.
pub async fn login_token(
    client: &reqwest::Client,
    address: &str,
    nickname: &str,
    password: &str,
) -> String {
    login(client, address, nickname, password).await["token"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Creates a PQRS as the given token's identity and returns the created body.
pub async fn create_pqrs(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    descripcion: &str,
) -> serde_json::Value {
    let response = client
        .post(format!("{}/pqrs", address))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "tipo": { "idTipo": 1, "descripcion": "Petición" },
            "descripcion": descripcion
        }))
        .send()
        .await
        .expect("create request failed");
    assert_eq!(response.status(), 201, "create should succeed");
    response.json().await.unwrap()
}
