// Content Graph Server

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use content_graph::{
    app_state::AppState,
    config::Config,
    content_interface::create_content_router,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize application state
    let app_state = AppState::new(config.clone()).await?;

    let content_router = create_content_router(app_state.content_interface.clone());

    // Build main application router
    let app = Router::new()
        .nest("/api/v1", content_router)
        .layer(CorsLayer::permissive());

    // Start server
    let addr = config.server_address();
    info!("Content graph server starting on http://{}", addr);
    info!("  GET    /api/v1/query/{{kind}}                      - Paginated view");
    info!("  POST   /api/v1/toggle/{{targetKind}}/{{targetId}}    - Toggle reaction or follow");
    info!("  POST   /api/v1/content                            - Publish content");
    info!("  POST   /api/v1/lists                              - Create list");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
