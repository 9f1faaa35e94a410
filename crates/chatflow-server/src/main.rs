mod api;

use api::{AppState, conversations, messages, models};
use axum::{
    Router,
    http::{Method, header},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

#[derive(serde::Serialize)]
struct Health {
    status: String,
}

async fn health() -> axum::Json<Health> {
    axum::Json(Health {
        status: "chatflow is working!".to_string(),
    })
}

fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(health))
        // Model catalog
        .route("/api/models", get(models::list_models))
        // Conversations and their messages
        .route(
            "/api/conversations",
            post(conversations::create_conversation),
        )
        .route(
            "/api/conversations/{id}/messages",
            get(conversations::list_messages).post(messages::stream_message),
        )
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Initialize tracing logger
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chatflow_server=debug".into()),
        )
        .with_target(false)
        .init();

    tracing::info!("Starting chatflow backend server");

    let api_key = std::env::var("OPENROUTER_API_KEY").unwrap_or_else(|_| {
        tracing::warn!("OPENROUTER_API_KEY is not set, provider calls will be rejected");
        String::new()
    });
    let db_path = std::env::var("CHATFLOW_DB").unwrap_or_else(|_| "chatflow.db".to_string());

    let state = AppState::new(&db_path, api_key).expect("Failed to initialize app state");
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .expect("Failed to bind to port 3000");

    tracing::info!("Chatflow running on http://localhost:3000");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
