use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;

pub const STATUS: &str = "FenerMacaBot çalışıyor!";

async fn status() -> (StatusCode, &'static str) {
    (StatusCode::OK, STATUS)
}

pub fn router() -> Router {
    Router::new().route("/", get(status))
}

pub async fn bind(port: u16) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
    log::info!("Health endpoint listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Serves until `stop` turns true or its sender goes away.
pub async fn serve(listener: TcpListener, mut stop: watch::Receiver<bool>) {
    let shutdown = async move {
        while !*stop.borrow_and_update() {
            if stop.changed().await.is_err() {
                break;
            }
        }
    };

    if let Err(e) = axum::serve(listener, router())
        .with_graceful_shutdown(shutdown)
        .await
    {
        log::error!("Health endpoint failed: {e}");
    }

    log::info!("Health endpoint shut down.");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn root_reports_status_until_stopped() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = watch::channel(false);
        let server = tokio::spawn(serve(listener, stop_rx));

        let response = reqwest::get(format!("http://{addr}/")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), STATUS);

        let response = reqwest::get(format!("http://{addr}/other")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

        stop_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server did not stop")
            .unwrap();
    }
}
