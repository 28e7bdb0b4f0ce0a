//! Authentication against a ServiceNow instance
//!
//! Basic auth and pre-issued bearer tokens are attached as is. The OAuth
//! password grant and JWT bearer grant talk to `{instance}/oauth_token.do`
//! and keep the issued token fresh.

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{Error, Result};

pub const JWT_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Seconds of validity below which a token is renewed before use
const REFRESH_MARGIN_SECS: i64 = 300;

/// How the client proves who it is
#[derive(Clone)]
pub enum Credentials {
    Basic {
        username: String,
        password: String,
    },
    /// OAuth password grant ("legacy mobile" flow)
    PasswordGrant {
        username: String,
        password: String,
        client_id: String,
        client_secret: String,
    },
    /// Exchanges a JWT signed by an OIDC provider for an access token
    Jwt {
        client_id: String,
        client_secret: String,
        jwt: String,
    },
    /// A bearer token obtained elsewhere
    Token(String),
}

impl Credentials {
    pub fn basic(username: &str, password: &str) -> Self {
        Credentials::Basic {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Credentials::Basic { username, .. } | Credentials::PasswordGrant { username, .. } => Some(username.as_str()),
            _ => None,
        }
    }
}

// Keep secrets out of debug output.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Basic { username, .. } => f.debug_struct("Basic").field("username", username).finish(),
            Credentials::PasswordGrant { username, client_id, .. } => f
                .debug_struct("PasswordGrant")
                .field("username", username)
                .field("client_id", client_id)
                .finish(),
            Credentials::Jwt { client_id, .. } => f.debug_struct("Jwt").field("client_id", client_id).finish(),
            Credentials::Token(_) => f.write_str("Token(..)"),
        }
    }
}

/// Token data structure. A token issued without `expires_in` never expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenData {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expiry_timestamp: Option<i64>,
}

impl TokenData {
    pub fn new(access_token: String, refresh_token: Option<String>, expires_in: Option<i64>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            access_token,
            refresh_token,
            expires_in,
            expiry_timestamp: expires_in.map(|secs| now + secs),
        }
    }

    /// More than the refresh margin of validity left
    pub fn is_fresh(&self) -> bool {
        match self.expiry_timestamp {
            Some(expiry) => expiry > chrono::Utc::now().timestamp() + REFRESH_MARGIN_SECS,
            None => true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    fn into_token(self, previous_refresh: Option<String>) -> Result<TokenData> {
        let access_token = self
            .access_token
            .ok_or_else(|| Error::Authentication("No access token in response".to_string()))?;
        Ok(TokenData::new(
            access_token,
            self.refresh_token.or(previous_refresh),
            self.expires_in,
        ))
    }
}

enum Grant {
    Basic { username: String, password: String },
    Password {
        username: String,
        // Dropped once the first grant succeeds; the refresh token takes over.
        password: Option<String>,
        client_id: String,
        client_secret: String,
    },
    Jwt { client_id: String, client_secret: String, jwt: String },
    Static(String),
}

struct AuthState {
    grant: Grant,
    token: Option<TokenData>,
}

pub(crate) struct Authenticator {
    http: reqwest::Client,
    token_url: String,
    state: Mutex<AuthState>,
}

impl Authenticator {
    pub(crate) fn new(http: reqwest::Client, instance: &str, credentials: Credentials) -> Self {
        let grant = match credentials {
            Credentials::Basic { username, password } => Grant::Basic { username, password },
            Credentials::PasswordGrant { username, password, client_id, client_secret } => Grant::Password {
                username,
                password: Some(password),
                client_id,
                client_secret,
            },
            Credentials::Jwt { client_id, client_secret, jwt } => Grant::Jwt { client_id, client_secret, jwt },
            Credentials::Token(token) => Grant::Static(token),
        };
        Self {
            http,
            token_url: format!("{}/oauth_token.do", instance),
            state: Mutex::new(AuthState { grant, token: None }),
        }
    }

    /// Attach credentials to an outgoing request, fetching or renewing the
    /// OAuth token first when needed.
    pub(crate) async fn apply(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder> {
        let mut state = self.state.lock().await;
        match &state.grant {
            Grant::Basic { username, password } => return Ok(builder.basic_auth(username, Some(password))),
            Grant::Static(token) => return Ok(builder.bearer_auth(token)),
            _ => {}
        }

        let token = self.ensure_fresh_token(&mut state).await?;
        Ok(builder.bearer_auth(token.access_token))
    }

    /// Runs the OAuth grant now instead of on the first request
    pub(crate) async fn authenticate(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if matches!(state.grant, Grant::Basic { .. } | Grant::Static(_)) {
            return Ok(());
        }
        self.ensure_fresh_token(&mut state).await?;
        Ok(())
    }

    async fn ensure_fresh_token(&self, state: &mut AuthState) -> Result<TokenData> {
        if let Some(token) = &state.token {
            if token.is_fresh() {
                return Ok(token.clone());
            }
        }

        let previous = state.token.take();
        let token = match &mut state.grant {
            Grant::Password { username, password, client_id, client_secret } => {
                match previous.and_then(|t| t.refresh_token) {
                    Some(refresh_token) => {
                        tracing::info!("Access token expiring soon, refreshing...");
                        self.refresh_access_token(&refresh_token, client_id, client_secret).await?
                    }
                    None => {
                        let secret = password.clone().ok_or_else(|| {
                            Error::Authentication(
                                "Access token expired and no refresh token was issued".to_string(),
                            )
                        })?;
                        let token = self.password_grant(username, &secret, client_id, client_secret).await?;
                        *password = None;
                        token
                    }
                }
            }
            Grant::Jwt { client_id, client_secret, jwt } => self.jwt_grant(jwt, client_id, client_secret).await?,
            Grant::Basic { .. } | Grant::Static(_) => {
                return Err(Error::Authentication("Credentials do not use OAuth tokens".to_string()))
            }
        };

        state.token = Some(token.clone());
        Ok(token)
    }

    async fn password_grant(
        &self,
        username: &str,
        password: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenData> {
        let params = [
            ("grant_type", "password"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("username", username),
            ("password", password),
        ];

        tracing::debug!("Requesting token via password grant for {}", username);
        let token = self.request_token(&params, None).await?.into_token(None)?;
        tracing::info!("Authenticated {} via password grant, expires_in={:?}", username, token.expires_in);
        Ok(token)
    }

    /// Refresh access token using refresh_token
    async fn refresh_access_token(&self, refresh_token: &str, client_id: &str, client_secret: &str) -> Result<TokenData> {
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
        ];

        let token = self
            .request_token(&params, None)
            .await?
            .into_token(Some(refresh_token.to_string()))?;
        tracing::debug!("Token refresh successful, expires_in={:?}", token.expires_in);
        Ok(token)
    }

    async fn jwt_grant(&self, jwt: &str, client_id: &str, client_secret: &str) -> Result<TokenData> {
        let params = [
            ("grant_type", JWT_GRANT_TYPE),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];

        tracing::debug!("Exchanging JWT for access token");
        self.request_token(&params, Some(jwt)).await?.into_token(None)
    }

    async fn request_token(&self, params: &[(&str, &str)], jwt: Option<&str>) -> Result<TokenResponse> {
        let mut request = self.http.post(&self.token_url).form(params);
        if let Some(jwt) = jwt {
            // ServiceNow reads the JWT from this (sic) header.
            request = request.header("Authentication", format!("Bearer {}", jwt));
        }

        let response = request.send().await?;
        if response.status().is_success() {
            Ok(response.json::<TokenResponse>().await?)
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            Err(Error::Authentication(format!("Token request failed ({}): {}", status, error_text)))
        }
    }
}
