use ad_core::config::Config;
use ad_session::BackendHealth;

use super::backend;

/// Run the `health` subcommand. Returns whether the backend is online.
pub async fn run(config: &Config) -> anyhow::Result<bool> {
    let backend = backend(config);
    let health = BackendHealth::probe(backend.as_ref()).await;

    if health.online {
        println!("backend:   online ({})", health.status);
        println!("database:  {}", health.database);
    } else {
        println!("backend:   offline");
        println!("url:       {}", config.backend.base_url);
        println!("reason:    {}", health.status);
    }
    tracing::debug!(health = %health.to_json(), "health probe done");
    Ok(health.online)
}

#[cfg(test)]
mod tests {
    use axum::{routing::get, Json, Router};
    use serde_json::json;

    use super::*;

    async fn config_for(app: Router) -> Config {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let mut config = Config::default();
        config.backend.base_url = format!("http://{addr}");
        config
    }

    #[tokio::test]
    async fn health_online() {
        let app = Router::new().route(
            "/health",
            get(|| async { Json(json!({"status": "Backend is running", "database": "Connected"})) }),
        );
        let config = config_for(app).await;

        assert!(run(&config).await.unwrap());
    }

    #[tokio::test]
    async fn health_server_error_is_offline() {
        let app = Router::new().route(
            "/health",
            get(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "") }),
        );
        let config = config_for(app).await;

        assert!(!run(&config).await.unwrap());
    }

    #[tokio::test]
    async fn health_unreachable_is_offline() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = Config::default();
        config.backend.base_url = format!("http://{addr}");
        assert!(!run(&config).await.unwrap());
    }
}
