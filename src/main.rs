use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::{routing::get, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use campus_api::handlers::protected::{audit, roles, session, settings, users};
use campus_api::handlers::public::auth;
use campus_api::middleware::{access_token_middleware, permission_guard};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT secrets, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = campus_api::config::config();
    tracing::info!("Starting Campus API in {:?} mode", config.environment);

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("CAMPUS_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Campus API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    let protected = Router::new()
        .merge(session_routes())
        .merge(role_routes())
        .merge(user_routes())
        .merge(audit_routes())
        // Access-token check runs before every protected route, including
        // the per-group permission guards layered below it
        .layer(middleware::from_fn(access_token_middleware));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_auth_routes())
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer()),
        )
}

fn public_auth_routes() -> Router {
    use axum::routing::post;

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/send-code", post(auth::send_code))
        .route("/auth/verify-code", post(auth::verify_code))
        .route("/auth/reset-password", post(auth::reset_password))
}

/// Routes available to any authenticated principal, no permission required.
fn session_routes() -> Router {
    use axum::routing::{delete, put};

    Router::new()
        .route("/api/auth/me", get(session::me))
        .route("/api/auth/session", delete(session::logout))
        // Reads are open to any session; writes are permission-gated below
        .route("/api/settings", get(settings::get))
        .route(
            "/api/settings",
            put(settings::put).layer(middleware::from_fn(|req: Request, next: Next| {
                permission_guard("settings.manage", req, next)
            })),
        )
}

fn role_routes() -> Router {
    use axum::routing::{post, put};

    Router::new()
        .route("/api/roles", get(roles::list).post(roles::create))
        .route("/api/roles/:id", put(roles::update).delete(roles::remove))
        .route(
            "/api/roles/:id/permissions/:permission_id",
            post(roles::grant).delete(roles::revoke),
        )
        .route("/api/permissions", get(roles::permissions))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            permission_guard("roles.manage", req, next)
        }))
}

fn user_routes() -> Router {
    use axum::routing::{delete, put};

    Router::new()
        .route("/api/users", get(users::list))
        .route("/api/users/:id", delete(users::remove))
        .route("/api/users/:id/role", put(users::assign_role))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            permission_guard("users.manage", req, next)
        }))
}

fn audit_routes() -> Router {
    Router::new()
        .route("/api/audit", get(audit::list))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            permission_guard("audit.view", req, next)
        }))
}

fn cors_layer() -> CorsLayer {
    let security = &campus_api::config::config().security;
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Campus API",
            "version": version,
            "description": "Learning management platform backend API",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "public_auth": "/auth/* (public - registration, login, refresh, verification codes)",
                "session": "/api/auth/me, /api/auth/session (protected)",
                "roles": "/api/roles, /api/permissions (protected, roles.manage)",
                "users": "/api/users (protected, users.manage)",
                "audit": "/api/audit (protected, audit.view)",
                "settings": "/api/settings (protected; writes require settings.manage)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match campus_api::database::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
