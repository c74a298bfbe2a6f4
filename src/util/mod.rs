//! Utility module
//!
//! Common utilities used across the application.

pub mod download;
pub mod hash;

use std::time::Duration;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("sowlauncher/", env!("CARGO_PKG_VERSION"));

/// Build the client for short requests (index, auth, status, reports)
pub fn http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    let timeout = Duration::from_secs(timeout_seconds);
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// Build the client for file downloads
///
/// Large files may take longer than `timeout_seconds` in total, so only a
/// stalled read fails.
pub fn download_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    let timeout = Duration::from_secs(timeout_seconds);
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(timeout)
        .read_timeout(timeout)
        .build()?;
    Ok(client)
}

/// Round a byte count to whole megabytes (1 MB = 1,000,000 bytes)
pub fn round_mb(bytes: u64) -> u64 {
    (bytes + 500_000) / 1_000_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_mb() {
        assert_eq!(round_mb(0), 0);
        assert_eq!(round_mb(499_999), 0);
        assert_eq!(round_mb(500_000), 1);
        assert_eq!(round_mb(41_600_000), 42);
    }

    #[tokio::test]
    async fn test_stalled_response_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept, then never answer
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let client = http_client(1).unwrap();
        let started = std::time::Instant::now();
        let err = client
            .get(format!("http://{}/distribution.json", addr))
            .send()
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(10));
        server.abort();
    }
}
