//! CRM client trait and its HTTP implementation.
//!
//! [`HttpCrmClient`] sends a JSON-encoded [`CrmContact`] to the configured
//! endpoint via HTTP POST. There is exactly one attempt per call; the
//! configured timeout bounds it and expiry counts as a failed sync.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::CrmConfig;
use crate::payload::CrmContact;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for CRM sync failures.
///
/// The `Display` text is shown to the requestor on the sync error page.
#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    /// The underlying HTTP request failed (network, DNS, TLS, etc.).
    #[error("CRM request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The call did not complete within the configured timeout.
    #[error("CRM did not respond within {0} seconds")]
    Timeout(u64),

    /// The CRM returned a non-2xx status code.
    #[error("CRM rejected the data ({status}): {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// One-way synchronisation of contact data to the CRM.
#[async_trait]
pub trait CrmClient: Send + Sync {
    /// Push one step's contact payload. Single attempt, no retry.
    async fn sync(&self, contact: &CrmContact) -> Result<(), CrmError>;
}

// ---------------------------------------------------------------------------
// HttpCrmClient
// ---------------------------------------------------------------------------

/// CRM client speaking JSON over HTTP.
pub struct HttpCrmClient {
    client: reqwest::Client,
    config: CrmConfig,
}

impl HttpCrmClient {
    /// Build a client whose every call is bounded by `config.timeout_secs`.
    pub fn new(config: CrmConfig) -> Result<Self, CrmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// The endpoint URL is stripped from transport errors since their text
    /// reaches the requestor.
    fn classify(&self, err: reqwest::Error) -> CrmError {
        if err.is_timeout() {
            CrmError::Timeout(self.config.timeout_secs)
        } else {
            tracing::debug!(url = %self.config.url, error = %err, "CRM request failed");
            CrmError::Request(err.without_url())
        }
    }
}

#[async_trait]
impl CrmClient for HttpCrmClient {
    async fn sync(&self, contact: &CrmContact) -> Result<(), CrmError> {
        let mut request = self.client.post(&self.config.url).json(contact);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(status = status.as_u16(), "CRM rejected contact payload");
            return Err(CrmError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(comments = contact.comments.len(), "Contact synced to CRM");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn config(url: String) -> CrmConfig {
        CrmConfig {
            url,
            api_key: Some("secret".into()),
            timeout_secs: 5,
        }
    }

    /// Serve exactly one HTTP exchange with a canned response, returning
    /// the raw request text.
    async fn one_shot_server(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/contacts", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                if request_complete(&raw) {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).into_owned()
        });

        (url, handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= header_end + 4 + content_length
    }

    #[test]
    fn crm_error_display_rejected() {
        let err = CrmError::Rejected {
            status: 502,
            body: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "CRM rejected the data (502): bad gateway");
    }

    #[test]
    fn crm_error_display_timeout() {
        assert_eq!(
            CrmError::Timeout(10).to_string(),
            "CRM did not respond within 10 seconds"
        );
    }

    #[tokio::test]
    async fn sync_posts_json_with_bearer_token() {
        let (url, server) =
            one_shot_server("HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n").await;
        let client = HttpCrmClient::new(config(url)).unwrap();

        client
            .sync(&CrmContact::captured("+48564738467"))
            .await
            .expect("sync should succeed on 204");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /contacts"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer secret"));
        assert!(request.contains(r#""phone":"+48564738467""#));
    }

    #[tokio::test]
    async fn sync_reports_non_success_status() {
        let (url, server) = one_shot_server(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 4\r\nConnection: close\r\n\r\ndown",
        )
        .await;
        let client = HttpCrmClient::new(config(url)).unwrap();

        let err = client
            .sync(&CrmContact::captured("+48564738467"))
            .await
            .unwrap_err();
        server.await.unwrap();

        match err {
            CrmError::Rejected { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "down");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn sync_reports_unreachable_endpoint() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpCrmClient::new(config(format!("http://{addr}/contacts"))).unwrap();
        let err = client
            .sync(&CrmContact::captured("+48564738467"))
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::Request(_)), "got {err:?}");
        assert!(
            !err.to_string().contains(&addr.to_string()),
            "endpoint leaked in {err}"
        );
    }
}
