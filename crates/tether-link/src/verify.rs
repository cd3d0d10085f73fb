// ABOUTME: Verification-code submission to the cloud API
// ABOUTME: Validates the code locally, posts it with the device identity, persists the returned token

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::{FileConfigStore, LinkConfig};
use crate::error::{LinkError, Result, VerifyError};

const VERIFY_PATH: &str = "/api/v1/octo/verify/";

/// Sends a human-entered (or discovery-issued) code to the server.
#[async_trait]
pub trait VerificationClient: Send + Sync {
    /// Links the device with `code`. On success the account token has been persisted.
    async fn submit(&self, code: &str) -> std::result::Result<(), VerifyError>;

    /// Server the codes are sent to, for diagnostics.
    fn endpoint(&self) -> &str;
}

/// Trims `code` and rejects it when nothing is left.
pub fn normalize_code(code: &str) -> std::result::Result<&str, VerifyError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(VerifyError::EmptyCode);
    }
    Ok(code)
}

#[derive(Deserialize)]
struct VerifyResponse {
    printer: LinkedPrinter,
}

#[derive(Deserialize)]
struct LinkedPrinter {
    auth_token: String,
}

/// Verification client talking to the server's REST API.
pub struct HttpVerificationClient {
    client: reqwest::Client,
    endpoint: String,
    device_name: String,
    store: FileConfigStore,
}

impl HttpVerificationClient {
    pub fn new(config: &LinkConfig, store: FileConfigStore) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(LinkError::HttpClient)?;

        Ok(Self {
            client,
            endpoint: config.endpoint()?.to_string(),
            device_name: config.device_name(),
            store,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

#[async_trait]
impl VerificationClient for HttpVerificationClient {
    async fn submit(&self, code: &str) -> std::result::Result<(), VerifyError> {
        let code = normalize_code(code)?;
        let url = format!("{}{}", self.endpoint, VERIFY_PATH);
        debug!(endpoint = %url, "verifying code");

        let resp = self
            .client
            .post(&url)
            .query(&[("code", code)])
            .json(&serde_json::json!({
                "device_name": self.device_name,
                "agent": env!("CARGO_PKG_NAME"),
                "agent_version": env!("CARGO_PKG_VERSION"),
            }))
            .send()
            .await
            .map_err(|e| VerifyError::Transport(e.to_string()))?;

        let status = resp.status();
        debug!(status = status.as_u16(), "server responded");
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(VerifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let linked: VerifyResponse = resp
            .json()
            .await
            .map_err(|e| VerifyError::Transport(format!("unexpected response: {e}")))?;

        self.store
            .save_auth_token(&linked.printer.auth_token)
            .map_err(|e| VerifyError::Persist(e.to_string()))?;

        Ok(())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> (HttpVerificationClient, NamedTempFile) {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "[server]\nendpoint = \"{}/\"\n\n[device]\nname = \"bench-printer\"\n",
            server.uri()
        )
        .unwrap();
        let store = FileConfigStore::new(file.path());
        let config = store.load().unwrap();
        (HttpVerificationClient::new(&config, store).unwrap(), file)
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" 123456\n"), Ok("123456"));
        assert_eq!(normalize_code(""), Err(VerifyError::EmptyCode));
        assert_eq!(normalize_code("   "), Err(VerifyError::EmptyCode));
    }

    #[tokio::test]
    async fn test_accepted_code_persists_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(VERIFY_PATH))
            .and(query_param("code", "123456"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"printer": {"auth_token": "tok-1"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (client, file) = client_for(&server);
        assert_eq!(client.endpoint(), server.uri());
        assert_eq!(client.device_name(), "bench-printer");

        client.submit("  123456 ").await.unwrap();

        let store = FileConfigStore::new(file.path());
        assert!(store.reload().unwrap().has_token);
    }

    #[tokio::test]
    async fn test_rejected_code_keeps_config_unlinked() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(VERIFY_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_string("code expired"))
            .mount(&server)
            .await;

        let (client, file) = client_for(&server);
        let err = client.submit("000000").await.unwrap_err();

        assert_eq!(
            err,
            VerifyError::Rejected {
                status: 400,
                body: "code expired".to_string()
            }
        );
        assert!(!FileConfigStore::new(file.path()).reload().unwrap().has_token);
    }

    #[tokio::test]
    async fn test_garbled_success_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(VERIFY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let (client, _file) = client_for(&server);
        let err = client.submit("123456").await.unwrap_err();
        assert!(matches!(err, VerifyError::Transport(_)));
    }

    #[tokio::test]
    async fn test_empty_code_never_reaches_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (client, _file) = client_for(&server);
        assert_eq!(client.submit("  ").await, Err(VerifyError::EmptyCode));
    }
}
