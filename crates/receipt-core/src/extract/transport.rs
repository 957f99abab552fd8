//! Transport to the remote chat-completion endpoint.

use std::future::Future;

use reqwest::Client;
use tracing::debug;

use crate::batch::Credential;
use crate::error::ExtractionError;

use super::request::ChatCompletionRequest;
use super::response::message_content;

/// Sends one chat-completion request and returns the reply text.
pub trait ChatTransport {
    /// Perform a single non-streaming completion call.
    fn complete(
        &self,
        request: &ChatCompletionRequest,
        credential: &Credential,
    ) -> impl Future<Output = Result<String, ExtractionError>> + Send;
}

/// HTTPS transport using bearer-token authorization.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    /// Create a transport for the given endpoint with a default client.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    /// Create a transport with a preconfigured client.
    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ChatTransport for HttpTransport {
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
        credential: &Credential,
    ) -> Result<String, ExtractionError> {
        debug!("POST {} (model {})", self.endpoint, request.model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(credential.expose())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ExtractionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Received {} byte response", body.len());
        message_content(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::request::{ChatMessage, ContentPart};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer a single HTTP request with a canned response and return the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}/chat/completions", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];

            loop {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);

                if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                    let length = head
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();

            String::from_utf8_lossy(&buf).into_owned()
        });

        (endpoint, handle)
    }

    fn transport(endpoint: String) -> HttpTransport {
        let client = Client::builder().no_proxy().build().unwrap();
        HttpTransport::with_client(client, endpoint)
    }

    fn request() -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: "sonar-pro".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![ContentPart::Text {
                    text: "read".to_string(),
                }],
            }],
            stream: false,
        }
    }

    #[tokio::test]
    async fn test_success_returns_message_content() {
        let (endpoint, server) = serve_once(
            "200 OK",
            r#"{"choices": [{"message": {"role": "assistant", "content": "[{\"amount\": \"100\"}]"}}]}"#,
        )
        .await;

        let reply = transport(endpoint)
            .complete(&request(), &Credential::new("test-key"))
            .await
            .unwrap();
        assert_eq!(reply, r#"[{"amount": "100"}]"#);

        let sent = server.await.unwrap();
        let lowered = sent.to_lowercase();
        assert!(sent.starts_with("POST /chat/completions"));
        assert!(lowered.contains("authorization: bearer test-key"));
        assert!(lowered.contains("content-type: application/json"));
        assert!(sent.contains(r#""model":"sonar-pro""#));
        assert!(sent.contains(r#""stream":false"#));
    }

    #[tokio::test]
    async fn test_error_status_maps_to_api_error() {
        let (endpoint, server) =
            serve_once("500 Internal Server Error", r#"{"error": "boom"}"#).await;

        let err = transport(endpoint)
            .complete(&request(), &Credential::new("test-key"))
            .await
            .unwrap_err();
        server.await.unwrap();

        match err {
            ExtractionError::Api { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, r#"{"error": "boom"}"#);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_success_without_content_is_missing_content() {
        let (endpoint, server) = serve_once("200 OK", r#"{"choices": []}"#).await;

        let err = transport(endpoint)
            .complete(&request(), &Credential::new("test-key"))
            .await
            .unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, ExtractionError::MissingContent(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}/chat/completions", listener.local_addr().unwrap());
        drop(listener);

        let err = transport(endpoint)
            .complete(&request(), &Credential::new("test-key"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Transport(_)));
    }
}
