mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn protected_route_without_header_is_missing_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/users", server.base_url))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["code"], "MISSING_TOKEN");
    Ok(())
}

#[tokio::test]
async fn protected_route_with_garbage_token_is_invalid_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/users", server.base_url))
        .bearer_auth("not.a.jwt")
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["code"], "INVALID_TOKEN");
    Ok(())
}

#[tokio::test]
async fn authenticated_but_ungranted_is_forbidden() -> Result<()> {
    let server = common::ensure_server().await?;
    let Some(_pool) = common::seeded_pool().await else {
        eprintln!("skipping: seeded database unavailable");
        return Ok(());
    };
    let client = reqwest::Client::new();

    let email = common::unique_email("forbidden");
    let res = client
        .post(format!("{}/auth/register", server.base_url))
        .json(&json!({ "name": "A", "email": email, "password": "secret123" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = res.json::<serde_json::Value>().await?;
    let access = body["data"]["accessToken"].as_str().unwrap().to_string();

    // Known principal, missing capability: 403, not 401
    let res = client
        .get(format!("{}/api/users", server.base_url))
        .bearer_auth(&access)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["code"], "FORBIDDEN");
    Ok(())
}

#[tokio::test]
async fn granting_the_permission_flips_forbidden_to_success() -> Result<()> {
    let server = common::ensure_server().await?;
    let Some(pool) = common::seeded_pool().await else {
        eprintln!("skipping: seeded database unavailable");
        return Ok(());
    };
    let client = reqwest::Client::new();

    let email = common::unique_email("grant-flip");
    let res = client
        .post(format!("{}/auth/register", server.base_url))
        .json(&json!({ "name": "A", "email": email, "password": "secret123" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = res.json::<serde_json::Value>().await?;
    let access = body["data"]["accessToken"].as_str().unwrap().to_string();

    let res = client
        .get(format!("{}/api/users", server.base_url))
        .bearer_auth(&access)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Grant through a throwaway role so the shared seeded roles stay intact
    let role_name = common::unique_email("role");
    sqlx::query("INSERT INTO roles (name) VALUES ($1)")
        .bind(&role_name)
        .execute(&pool)
        .await?;
    sqlx::query(
        "INSERT INTO role_permissions (role_id, permission_id)
         SELECT r.id, p.id FROM roles r, permissions p
         WHERE r.name = $1 AND p.code = 'users.manage'",
    )
    .bind(&role_name)
    .execute(&pool)
    .await?;
    sqlx::query(
        "UPDATE users SET role_id = (SELECT id FROM roles WHERE name = $2) WHERE email = $1",
    )
    .bind(&email)
    .bind(&role_name)
    .execute(&pool)
    .await?;

    // Same access token, permission resolved fresh: the denial flips
    let res = client
        .get(format!("{}/api/users", server.base_url))
        .bearer_auth(&access)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true);
    Ok(())
}

#[tokio::test]
async fn me_requires_authentication() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/auth/me", server.base_url))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["code"], "MISSING_TOKEN");
    Ok(())
}
