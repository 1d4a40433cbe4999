//! TCP listener for the HTTP API.

use tracing::info;

use super::{AppState, router};

/// Serves the API on `host:port` until Ctrl-C.
///
/// In-flight streams are cancelled when their connections close.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let tcp_listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "dealroom API listening");

    // Logs may be filtered out; always tell the operator where to connect.
    #[allow(clippy::print_stderr)]
    {
        eprintln!("dealroom API listening on http://{addr}/api");
    }

    axum::serve(tcp_listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    Ok(())
}
