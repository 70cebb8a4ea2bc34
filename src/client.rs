use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{
    AccessToken, CompanyRegistration, CompanyRegistrationRequest, Identity, Organization,
    SignupRequest,
};

/// The REST backend as seen by the session controller.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> AppResult<AccessToken>;
    async fn current_identity(&self, token: &str) -> AppResult<Identity>;
    async fn my_organization(&self, token: &str) -> AppResult<Organization>;
    async fn signup(&self, request: &SignupRequest) -> AppResult<Identity>;
    async fn register_organization(
        &self,
        request: &CompanyRegistrationRequest,
    ) -> AppResult<CompanyRegistration>;
}

#[derive(Debug, Clone)]
pub struct HttpIdentityApi {
    client: Client,
    base_url: String,
}

impl HttpIdentityApi {
    pub fn new(base_url: impl Into<String>, timeout: std::time::Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::configuration(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &SessionConfig) -> AppResult<Self> {
        Self::new(config.api_url.clone(), config.http_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, method: &str, path: &str, request: RequestBuilder) -> AppResult<T> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();

        let response = request.send().await.map_err(|err| {
            tracing::error!(%request_id, method, path, error = %err, "request failed to send");
            AppError::from(err)
        })?;

        let status = response.status();
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if status.is_success() {
            tracing::debug!(%request_id, method, path, status = status.as_u16(), elapsed_ms, "api response");
            return response.json::<T>().await.map_err(AppError::from);
        }

        let detail = error_detail(response).await;
        tracing::warn!(
            %request_id,
            method,
            path,
            status = status.as_u16(),
            elapsed_ms,
            detail = %detail,
            "api error"
        );
        Err(classify(status, detail))
    }
}

#[async_trait]
impl IdentityApi for HttpIdentityApi {
    async fn login(&self, email: &str, password: &str) -> AppResult<AccessToken> {
        let path = "/login/access-token";
        let request = self
            .client
            .post(self.url(path))
            .form(&[("username", email), ("password", password)]);
        self.send("POST", path, request).await
    }

    async fn current_identity(&self, token: &str) -> AppResult<Identity> {
        let path = "/users/me";
        let request = self.client.get(self.url(path)).bearer_auth(token);
        self.send("GET", path, request).await
    }

    async fn my_organization(&self, token: &str) -> AppResult<Organization> {
        let path = "/companies/me";
        let request = self.client.get(self.url(path)).bearer_auth(token);
        self.send("GET", path, request).await
    }

    async fn signup(&self, body: &SignupRequest) -> AppResult<Identity> {
        let path = "/users/signup";
        let request = self.client.post(self.url(path)).json(body);
        self.send("POST", path, request).await
    }

    async fn register_organization(
        &self,
        body: &CompanyRegistrationRequest,
    ) -> AppResult<CompanyRegistration> {
        let path = "/companies/register";
        let request = self.client.post(self.url(path)).json(body);
        self.send("POST", path, request).await
    }
}

/// Pulls the human-readable `detail` out of an error body.
/// It may be a string or a list of validation errors carrying `msg`.
async fn error_detail(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let detail = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| value.get("detail").cloned())
        .and_then(|detail| match detail {
            Value::String(text) => Some(text),
            Value::Array(items) => {
                let messages: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect();
                (!messages.is_empty()).then(|| messages.join("; "))
            }
            _ => None,
        });

    detail.unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    })
}

/// Maps an HTTP failure onto the crate's error taxonomy.
pub fn classify(status: StatusCode, detail: String) -> AppError {
    let lowered = detail.to_lowercase();
    match status.as_u16() {
        400 if lowered.contains("compan") && (lowered.contains("inactive") || lowered.contains("validation")) => {
            AppError::inactive_organization(detail)
        }
        400 if lowered.contains("inactive") => AppError::inactive_account(detail),
        400 | 422 => AppError::bad_request(detail),
        401 => AppError::unauthorized(detail),
        403 => AppError::forbidden(detail),
        404 => AppError::not_found(detail),
        code if status.is_server_error() => AppError::server(code, detail),
        code => AppError::internal(format!("unexpected status {code}: {detail}")),
    }
}
