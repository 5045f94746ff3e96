#[tokio::main]
async fn main() {
    metasoft_observability::init();

    let sessions = metasoft_api::middleware::SessionStore::from_env();
    let app = metasoft_api::app::build_app(sessions).await;

    let bind = std::env::var("METASOFT_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind}: {e}"));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
