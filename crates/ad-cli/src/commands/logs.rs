use ad_core::config::Config;
use ad_session::{DispatchError, EventBus, LogStreamConsumer, SessionEvent, StreamState};

use super::{backend, format_log_entry, friendly_error, LogCursor};

/// Run the `logs` subcommand: print log entries until the feed closes or
/// the user interrupts.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    tail(config).await.map(|_| ())
}

/// Returns the number of entries printed.
async fn tail(config: &Config) -> anyhow::Result<usize> {
    let events = EventBus::new();
    let failures = events.subscribe();
    let consumer = LogStreamConsumer::start(backend(config), config.logs.capacity, events);

    let mut buffer = consumer.subscribe();
    let mut state = consumer.subscribe_state();
    let mut cursor = LogCursor::default();
    let mut printed = 0;

    loop {
        if *state.borrow_and_update() == StreamState::Closed {
            break;
        }
        tokio::select! {
            Ok(()) = buffer.changed() => {
                let fresh = cursor.fresh(&buffer.borrow_and_update());
                for entry in &fresh {
                    println!("{}", format_log_entry(entry));
                }
                printed += fresh.len();
            }
            Ok(()) = state.changed() => {}
            _ = tokio::signal::ctrl_c() => {
                consumer.close();
                break;
            }
        }
    }

    // Entries that raced with the close.
    let fresh = cursor.fresh(&buffer.borrow_and_update());
    for entry in &fresh {
        println!("{}", format_log_entry(entry));
    }
    printed += fresh.len();

    for event in failures.drain() {
        if let SessionEvent::Failed(DispatchError::LogStream(e)) = event {
            return Err(friendly_error(e, &config.backend.base_url));
        }
    }
    Ok(printed)
}

#[cfg(test)]
mod tests {
    use axum::{http::header, routing::get, Router};

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
    async fn logs_prints_until_feed_ends() {
        let app = Router::new().route(
            "/api/v1/logs/stream",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "text/event-stream")],
                    "data: 10:00:00 | INFO | Cloning repository\n\n\
                     data: garbage\n\n\
                     data: 10:00:01 | SUCCESS | Analysis done\n\n",
                )
            }),
        );
        let config = config_for(app).await;

        assert_eq!(tail(&config).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn logs_fails_when_feed_is_unavailable() {
        let app = Router::new().route(
            "/api/v1/logs/stream",
            get(|| async { axum::http::StatusCode::SERVICE_UNAVAILABLE }),
        );
        let config = config_for(app).await;

        assert!(run(&config).await.is_err());
    }
}
