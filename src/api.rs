use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::config::AppConfig;
use crate::errors::{DashboardError, DashboardResult};
use crate::logger::Logger;
use crate::models::{Account, AutomationParams, Session};

/// Bearer token shared between the auth gate and every outgoing request.
/// Read at send time, so a rotation applies to the next call only.
pub type Credential = Arc<RwLock<Option<String>>>;

/// Replies to this path carry the bearer token and are never logged verbatim.
const LOGIN_PATH: &str = "/api/login";

// ── Response envelopes ──────────────────────────────────────────────────

/// Every endpoint answers `{success, message?, ...payload}`.
#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(flatten)]
    payload: T,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionsPayload {
    #[serde(default)]
    sessions: Vec<Session>,
}

#[derive(Deserialize)]
struct AccountsPayload {
    #[serde(default)]
    accounts: Vec<Account>,
}

#[derive(Deserialize)]
struct ProxiesPayload {
    #[serde(default)]
    proxies: Vec<String>,
}

#[derive(Deserialize)]
struct SessionPayload {
    #[serde(default)]
    session: Option<Session>,
}

#[derive(Deserialize)]
struct LaunchPayload {
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Ack {}

// ── Client ──────────────────────────────────────────────────────────────

/// Thin JSON client for the automation backend.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Option<Duration>,
    credential: Credential,
    logger: Arc<Logger>,
}

impl ApiClient {
    pub fn new(config: &AppConfig, logger: Arc<Logger>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout(),
            credential: Arc::new(RwLock::new(None)),
            logger,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credential(&self) -> Credential {
        self.credential.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.credential
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.credential.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    /// Headers for an authenticated call, built from the credential as it is right now.
    pub fn auth_headers(&self) -> DashboardResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = self.token() {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| DashboardError::Unauthorized)?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        authenticated: bool,
    ) -> DashboardResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method.clone(), &url);
        if authenticated {
            request = request.headers(self.auth_headers()?);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let _ = self.logger.log_request(method.as_str(), path);
        let response = request.send().await?;
        let status = response.status();
        if authenticated && status == StatusCode::UNAUTHORIZED {
            return Err(DashboardError::Unauthorized);
        }

        let text = response.text().await?;
        if path == LOGIN_PATH {
            let _ = self.logger.log_response(path, "<redacted>");
        } else {
            let _ = self.logger.log_response(path, &text);
        }
        decode_envelope(&text, status)
    }

    /// Exchange credentials for a bearer token. Does not touch the stored credential.
    pub async fn login(&self, username: &str, password: &str) -> DashboardResult<String> {
        let body = json!({ "username": username, "password": password });
        let payload: LoginPayload = self.send(Method::POST, LOGIN_PATH, Some(body), false).await?;
        // a success without a token is still a refused login
        payload.token.ok_or(DashboardError::Rejected {
            message: None,
            status: StatusCode::OK.as_u16(),
        })
    }

    pub async fn sessions(&self) -> DashboardResult<Vec<Session>> {
        let payload: SessionsPayload = self.send(Method::GET, "/api/sessions", None, true).await?;
        Ok(payload.sessions)
    }

    pub async fn accounts(&self) -> DashboardResult<Vec<Account>> {
        let payload: AccountsPayload = self.send(Method::GET, "/api/accounts", None, true).await?;
        Ok(payload.accounts)
    }

    pub async fn proxies(&self) -> DashboardResult<Vec<String>> {
        let payload: ProxiesPayload = self.send(Method::GET, "/api/proxies", None, true).await?;
        Ok(payload.proxies)
    }

    pub async fn add_proxy(&self, proxy: &str) -> DashboardResult<()> {
        let _: Ack = self
            .send(Method::POST, "/api/proxies", Some(json!({ "proxy": proxy })), true)
            .await?;
        Ok(())
    }

    pub async fn remove_proxy(&self, proxy: &str) -> DashboardResult<()> {
        let _: Ack = self
            .send(Method::DELETE, "/api/proxies", Some(json!({ "proxy": proxy })), true)
            .await?;
        Ok(())
    }

    pub async fn add_user(&self, username: &str, password: &str) -> DashboardResult<()> {
        let body = json!({ "username": username, "password": password });
        let _: Ack = self.send(Method::POST, "/api/users", Some(body), true).await?;
        Ok(())
    }

    /// Launch a session and return its id.
    pub async fn start_automation(&self, params: &AutomationParams) -> DashboardResult<String> {
        let body = serde_json::to_value(params)?;
        let payload: LaunchPayload = self
            .send(Method::POST, "/api/start_automation", Some(body), true)
            .await?;
        payload
            .session_id
            .ok_or_else(|| DashboardError::Decode("launch response carried no session_id".to_string()))
    }

    pub async fn session(&self, id: &str) -> DashboardResult<Session> {
        let path = format!("/api/session/{id}");
        let payload: SessionPayload = self.send(Method::GET, &path, None, true).await?;
        payload
            .session
            .ok_or_else(|| DashboardError::Decode(format!("session {id} missing from response")))
    }
}

/// Parse `{success, message?, ...}` regardless of HTTP status; error bodies are JSON too.
fn decode_envelope<T: DeserializeOwned>(text: &str, status: StatusCode) -> DashboardResult<T> {
    let envelope: Envelope<T> = serde_json::from_str(text)
        .map_err(|e| DashboardError::Decode(format!("HTTP {status}: {e}")))?;
    if !envelope.success {
        return Err(DashboardError::Rejected {
            message: envelope.message,
            status: status.as_u16(),
        });
    }
    Ok(envelope.payload)
}
