mod common;

use common::{client, login, login_token, spawn_app, spawn_app_with_env};
use pqrs_portal::config::Env;
use serial_test::serial;

/// Resolves the caller's own usuario id through /me.
async fn own_id(c: &reqwest::Client, address: &str, token: &str) -> String {
    let me: serde_json::Value = c
        .get(format!("{}/me", address))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    me["idUsuario"].as_str().unwrap().to_string()
}

#[tokio::test]
#[serial]
async fn health_check_is_public() {
    let app = spawn_app().await;
    let response = client()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
}

#[tokio::test]
#[serial]
async fn empty_credentials_fail_before_any_lookup() {
    let app = spawn_app().await;
    let c = client();

    for body in [
        serde_json::json!({ "nickname": "", "password": "" }),
        serde_json::json!({ "nickname": "   ", "password": "123456" }),
        serde_json::json!({ "nickname": "usuario", "password": " " }),
    ] {
        let response = c
            .post(format!("{}/auth/login", app.address))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 422);
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("Completa"));
    }
}

#[tokio::test]
#[serial]
async fn bad_credentials_are_rejected_with_no_session() {
    let app = spawn_app().await;
    let c = client();

    let response = c
        .post(format!("{}/auth/login", app.address))
        .json(&serde_json::json!({ "nickname": "usuario", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[serial]
async fn login_persists_session_and_returns_role_based_redirect() {
    let app = spawn_app().await;
    let c = client();

    let body = login(&c, &app.address, "usuario", "123456").await;
    assert_eq!(body["rol"], "USER");
    assert_eq!(body["redirectTo"], "/dashboard");
    assert_eq!(body["email"], "usuario@citasalud.com");
    assert!(body["token"].as_str().unwrap().len() > 20);

    // The persisted session backs /me immediately.
    let me = c
        .get(format!("{}/me", app.address))
        .bearer_auth(body["token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(me.status(), 200);
    let me: serde_json::Value = me.json().await.unwrap();
    assert_eq!(me["rol"], "USER");
    assert_eq!(me["username"], "usuario");

    let admin = login(&c, &app.address, "admin", "admin123").await;
    assert_eq!(admin["rol"], "ADMIN");
    assert_eq!(admin["redirectTo"], "/admin/dashboard");

    let gestor = login(&c, &app.address, "gestor", "gestor123").await;
    assert_eq!(gestor["rol"], "GESTOR");
    assert_eq!(gestor["redirectTo"], "/gestor/dashboard");
}

#[tokio::test]
#[serial]
async fn anonymous_caller_is_redirected_to_patient_login() {
    let app = spawn_app().await;
    let response = client()
        .get(format!("{}/me", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 307);
    assert_eq!(
        response.headers()["location"].to_str().unwrap(),
        "/patient-login"
    );
}

#[tokio::test]
#[serial]
async fn dev_header_authenticates_an_existing_usuario_locally() {
    let app = spawn_app().await;
    let c = client();
    let token = login_token(&c, &app.address, "usuario", "123456").await;
    let id = own_id(&c, &app.address, &token).await;

    // No bearer token: the x-user-id header alone carries the identity.
    let response = c
        .get(format!("{}/me", app.address))
        .header("x-user-id", &id)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let me: serde_json::Value = response.json().await.unwrap();
    assert_eq!(me["username"], "usuario");
    assert_eq!(me["rol"], "USER");
}

#[tokio::test]
#[serial]
async fn dev_header_never_fabricates_an_identity() {
    let app = spawn_app().await;

    // A UUID with no usuario behind it resolves to no session at all.
    let response = client()
        .get(format!("{}/me", app.address))
        .header("x-user-id", uuid::Uuid::new_v4().to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 307);
    assert_eq!(
        response.headers()["location"].to_str().unwrap(),
        "/patient-login"
    );
}

#[tokio::test]
#[serial]
async fn dev_header_is_inert_in_production() {
    let app = spawn_app_with_env(Env::Production).await;
    let c = client();
    let token = login_token(&c, &app.address, "usuario", "123456").await;
    let id = own_id(&c, &app.address, &token).await;

    // The very id that works through the bypass locally is ignored here.
    let response = c
        .get(format!("{}/me", app.address))
        .header("x-user-id", &id)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 307);
    assert_eq!(
        response.headers()["location"].to_str().unwrap(),
        "/patient-login"
    );
}

#[tokio::test]
#[serial]
async fn gestor_session_does_not_reach_the_admin_subtree() {
    let app = spawn_app().await;
    let c = client();
    let token = login_token(&c, &app.address, "gestor", "gestor123").await;

    // Exact-match guard: a GESTOR is sent to /unauthorized, not granted access.
    let response = c
        .get(format!("{}/gestion/usuarios", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 307);
    assert_eq!(
        response.headers()["location"].to_str().unwrap(),
        "/unauthorized"
    );
}

#[tokio::test]
#[serial]
async fn logout_invalidates_the_token_immediately() {
    let app = spawn_app().await;
    let c = client();
    let token = login_token(&c, &app.address, "usuario", "123456").await;

    let response = c
        .post(format!("{}/auth/logout", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    // The JWT itself is still unexpired, but the session is gone.
    let response = c
        .get(format!("{}/me", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 307);
    assert_eq!(
        response.headers()["location"].to_str().unwrap(),
        "/patient-login"
    );
}
