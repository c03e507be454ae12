use std::borrow::Cow;
use std::sync::Arc;

use anyhow::Context;
use reqwest::StatusCode;

use crate::entity::user::Entity as UserEntity;
use crate::helper::{from_env_opt, from_env_or};
use crate::service::deployment::Deployment;

const HEADER_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));

pub(crate) const AUTHORIZATION_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub(crate) const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub(crate) const TOKEN_INFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
pub(crate) const CALLBACK_PATH: &str = "/api/auth/google/callback";
pub(crate) const ALLOWED_DOMAIN: &str = "creode.co.uk";

pub(crate) const SCOPE: &str = "openid email profile";

#[derive(Debug)]
pub(crate) struct Config {
    client_id: Option<String>,
    client_secret: Option<String>,
    authorization_url: Cow<'static, str>,
    token_url: Cow<'static, str>,
    token_info_url: Cow<'static, str>,
    allowed_domain: Cow<'static, str>,
}

impl Config {
    pub(crate) fn from_env() -> Self {
        Self {
            client_id: from_env_opt("GOOGLE_CLIENT_ID"),
            client_secret: from_env_opt("GOOGLE_CLIENT_SECRET"),
            authorization_url: from_env_or("GOOGLE_AUTHORIZATION_URL", AUTHORIZATION_URL),
            token_url: from_env_or("GOOGLE_TOKEN_URL", TOKEN_URL),
            token_info_url: from_env_or("GOOGLE_TOKEN_INFO_URL", TOKEN_INFO_URL),
            allowed_domain: from_env_or("ALLOWED_EMAIL_DOMAIN", ALLOWED_DOMAIN),
        }
    }

    pub(crate) fn build(self, deployment: &Deployment) -> anyhow::Result<Client> {
        let http = reqwest::Client::builder()
            .user_agent(HEADER_USER_AGENT)
            .build()
            .context("building http client")?;
        Ok(Client(Arc::new(Inner {
            client_id: self.client_id,
            client_secret: self.client_secret,
            redirect_uri: deployment.url(CALLBACK_PATH),
            authorization_url: self.authorization_url,
            token_url: self.token_url,
            token_info_url: self.token_info_url,
            allowed_domain: self.allowed_domain,
            http,
        })))
    }
}

#[cfg(test)]
pub(crate) const TEST_CLIENT_ID: &str = "abc123";

#[cfg(test)]
impl Config {
    pub(crate) fn test() -> Self {
        Self {
            client_id: Some(TEST_CLIENT_ID.into()),
            client_secret: Some("client-secret".into()),
            authorization_url: Cow::Borrowed(AUTHORIZATION_URL),
            token_url: Cow::Borrowed(TOKEN_URL),
            token_info_url: Cow::Borrowed(TOKEN_INFO_URL),
            allowed_domain: Cow::Borrowed(ALLOWED_DOMAIN),
        }
    }

    /// Points the token endpoints to a mock server.
    pub(crate) fn with_base_url(mut self, base_url: &str) -> Self {
        self.token_url = Cow::Owned(format!("{base_url}/token"));
        self.token_info_url = Cow::Owned(format!("{base_url}/tokeninfo"));
        self
    }

    pub(crate) fn without_client_id(mut self) -> Self {
        self.client_id = None;
        self
    }

    pub(crate) fn without_client_secret(mut self) -> Self {
        self.client_secret = None;
        self
    }
}

#[derive(Debug)]
pub(crate) enum ClientError {
    NotConfigured,
    Encoding(serde_urlencoded::ser::Error),
    Request(reqwest::Error),
    Rejected { status: StatusCode, body: String },
    AudienceMismatch,
}

impl std::error::Error for ClientError {}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured => f.write_str("google client not configured"),
            Self::Encoding(inner) => write!(f, "unable to encode parameters: {inner}"),
            Self::Request(inner) => write!(f, "unable to reach google: {inner}"),
            Self::Rejected { status, body } => {
                write!(f, "google answered with status {status}: {body:?}")
            }
            Self::AudienceMismatch => f.write_str("token issued for another client"),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        Self::Request(value)
    }
}

#[derive(serde::Serialize)]
struct AuthorizationParams<'a> {
    client_id: &'a str,
    redirect_uri: &'a str,
    response_type: &'static str,
    scope: &'static str,
    state: &'a str,
    access_type: &'static str,
    prompt: &'static str,
}

#[derive(serde::Serialize)]
struct TokenRequest<'a> {
    code: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
    grant_type: &'static str,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct TokenResponse {
    pub id_token: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct TokenInfo {
    aud: Option<String>,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug)]
struct Inner {
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: String,
    authorization_url: Cow<'static, str>,
    token_url: Cow<'static, str>,
    token_info_url: Cow<'static, str>,
    allowed_domain: Cow<'static, str>,
    http: reqwest::Client,
}

#[derive(Clone, Debug)]
pub(crate) struct Client(Arc<Inner>);

impl Client {
    pub fn client_id(&self) -> Option<&str> {
        self.0.client_id.as_deref()
    }

    pub fn is_configured(&self) -> bool {
        self.0.client_id.is_some() && self.0.client_secret.is_some()
    }

    pub fn redirect_uri(&self) -> &str {
        self.0.redirect_uri.as_str()
    }

    pub fn allowed_domain(&self) -> &str {
        self.0.allowed_domain.as_ref()
    }

    /// Builds the consent page url the browser gets redirected to.
    ///
    /// The consent prompt is forced so that a refresh token is issued on every authorization.
    pub fn authorization_url(&self, client_id: &str, state: &str) -> Result<String, ClientError> {
        let params = serde_urlencoded::to_string(AuthorizationParams {
            client_id,
            redirect_uri: self.redirect_uri(),
            response_type: "code",
            scope: SCOPE,
            state,
            access_type: "offline",
            prompt: "consent",
        })
        .map_err(ClientError::Encoding)?;
        Ok(format!("{}?{params}", self.0.authorization_url))
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, ClientError> {
        let (Some(client_id), Some(client_secret)) =
            (self.0.client_id.as_deref(), self.0.client_secret.as_deref())
        else {
            return Err(ClientError::NotConfigured);
        };
        let response = self
            .0
            .http
            .post(self.0.token_url.as_ref())
            .form(&TokenRequest {
                code,
                client_id,
                client_secret,
                redirect_uri: self.redirect_uri(),
                grant_type: "authorization_code",
            })
            .send()
            .await?;
        tracing::debug!("received response {:?}", response.status());
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(ClientError::Rejected {
                status: response.status(),
                body: response.text().await?,
            })
        }
    }

    /// Validates an id token against google and extracts the user it describes.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn verify_id_token(&self, id_token: &str) -> Result<UserEntity, ClientError> {
        let response = self
            .0
            .http
            .get(self.0.token_info_url.as_ref())
            .query(&[("id_token", id_token)])
            .send()
            .await?;
        tracing::debug!("received response {:?}", response.status());
        if !response.status().is_success() {
            return Err(ClientError::Rejected {
                status: response.status(),
                body: response.text().await?,
            });
        }
        let info: TokenInfo = response.json().await?;
        if let Some(client_id) = self.client_id() {
            if info.aud.as_deref() != Some(client_id) {
                return Err(ClientError::AudienceMismatch);
            }
        }
        Ok(UserEntity {
            email: info.email.unwrap_or_default(),
            name: info.name,
            picture: info.picture,
        })
    }
}
