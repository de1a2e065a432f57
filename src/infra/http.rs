//! REST adapter for the banking backend.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};

use crate::domain::{
    Account, AccountId, AppError, BankingApi, ConfigError, Contact, ExternalServiceError,
    SubmitTransferRequest, Transaction, User, UserId,
};

/// Backend used when nothing else is configured
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";

/// Request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for [`HttpBankingApi`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl HttpClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }

    /// Load from `BACKEND_URL` and `HTTP_TIMEOUT_SECS`, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("BACKEND_URL")
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let timeout_secs = match env::var("HTTP_TIMEOUT_SECS") {
            Ok(raw) if !raw.is_empty() => {
                raw.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                    name: "HTTP_TIMEOUT_SECS".to_string(),
                    message: e.to_string(),
                })?
            }
            _ => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self::new(base_url, Duration::from_secs(timeout_secs)))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                name: "base_url".to_string(),
                message: format!("expected an http(s) URL, got '{}'", self.base_url),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "timeout".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// [`BankingApi`] over the backend's JSON endpoints
#[derive(Debug, Clone)]
pub struct HttpBankingApi {
    http_client: Client,
    base_url: String,
}

impl HttpBankingApi {
    pub fn new(config: HttpClientConfig) -> Result<Self, AppError> {
        config.validate()?;

        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExternalServiceError::Configuration(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Client with the default timeout against `base_url`
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, AppError> {
        Self::new(HttpClientConfig {
            base_url: base_url.into(),
            ..Default::default()
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let body = self.send(self.http_client.get(self.url(path)), path).await?;
        serde_json::from_str(&body).map_err(|e| {
            error!(path = %path, error = %e, "Failed to parse backend response");
            AppError::ExternalService(ExternalServiceError::ParseError(e.to_string()))
        })
    }

    /// Send a request and return the body of a 2xx response
    async fn send(&self, request: RequestBuilder, path: &str) -> Result<String, AppError> {
        debug!(path = %path, "Calling backend");

        let response = request.send().await.map_err(|e| {
            error!(path = %path, error = %e, "Backend request failed");
            transport_error(&e)
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::ExternalService(ExternalServiceError::NotFound(
                path.to_string(),
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(path = %path, status = %status, body = %body, "Backend returned error");
            return Err(AppError::ExternalService(ExternalServiceError::ApiError {
                status_code: status.as_u16(),
                message: body,
            }));
        }

        response.text().await.map_err(|e| transport_error(&e))
    }
}

fn transport_error(e: &reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::ExternalService(ExternalServiceError::Timeout(e.to_string()))
    } else {
        AppError::ExternalService(ExternalServiceError::Network(e.to_string()))
    }
}

#[async_trait]
impl BankingApi for HttpBankingApi {
    #[instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.get_json("/usuarios").await
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: UserId) -> Result<User, AppError> {
        self.get_json(&format!("/usuarios/{}", user_id)).await
    }

    #[instrument(skip(self))]
    async fn get_accounts(&self, user_id: UserId) -> Result<Vec<Account>, AppError> {
        self.get_json(&format!("/cuentas/usuario/{}", user_id)).await
    }

    #[instrument(skip(self))]
    async fn get_contacts(&self, user_id: UserId) -> Result<Vec<Contact>, AppError> {
        self.get_json(&format!("/contactos/usuario/{}", user_id)).await
    }

    #[instrument(
        skip(self, request),
        fields(
            source_account_id = %request.source_account_id,
            destination_account_id = %request.destination_account_id
        )
    )]
    async fn submit_transfer(
        &self,
        request: &SubmitTransferRequest,
    ) -> Result<Option<Transaction>, AppError> {
        let path = "/transacciones";
        let body = self
            .send(self.http_client.post(self.url(path)).json(request), path)
            .await?;

        if body.trim().is_empty() {
            return Ok(None);
        }
        match serde_json::from_str::<Transaction>(&body) {
            Ok(transaction) => Ok(Some(transaction)),
            Err(e) => {
                debug!(error = %e, "Transfer acknowledged without a transaction body");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_outgoing_transactions(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, AppError> {
        self.get_json(&format!("/transacciones/enviadas/{}", account_id))
            .await
    }

    #[instrument(skip(self))]
    async fn get_incoming_transactions(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, AppError> {
        self.get_json(&format!("/transacciones/recibidas/{}", account_id))
            .await
    }
}
