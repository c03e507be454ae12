use std::borrow::Cow;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;

use crate::entity::user::Entity as UserEntity;
use crate::router::api::error::Error;
use crate::service::deployment::Deployment;
use crate::service::google::Client as GoogleClient;
use crate::service::session::{Codec as SessionCodec, AUTH_COOKIE, SESSION_TTL};

#[derive(Debug)]
pub(crate) enum ResponseError {
    InvalidPayload,
    CredentialMissing,
    InvalidToken,
    DomainRestricted(String),
    Session,
}

impl ResponseError {
    fn status_and_message(self) -> (StatusCode, Cow<'static, str>) {
        match self {
            Self::InvalidPayload => (
                StatusCode::BAD_REQUEST,
                Cow::Borrowed("Invalid JSON in request body"),
            ),
            Self::CredentialMissing => (
                StatusCode::BAD_REQUEST,
                Cow::Borrowed("No credential provided"),
            ),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, Cow::Borrowed("Invalid Google token")),
            Self::DomainRestricted(domain) => (
                StatusCode::FORBIDDEN,
                Cow::Owned(format!("Access restricted to {domain} email addresses")),
            ),
            Self::Session => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Cow::Borrowed("Authentication failed"),
            ),
        }
    }
}

impl IntoResponse for ResponseError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = self.status_and_message();
        Error::new(status, message).into_response()
    }
}

impl From<JsonRejection> for ResponseError {
    fn from(value: JsonRejection) -> Self {
        tracing::debug!(message = "failed decoding json payload", cause = %value);
        Self::InvalidPayload
    }
}

#[derive(Debug, serde::Deserialize)]
#[cfg_attr(test, derive(serde::Serialize))]
pub(crate) struct RequestPayload {
    #[serde(default)]
    credential: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub(crate) struct ResponsePayload {
    user: UserEntity,
    success: bool,
}

/// Signs in with an id token obtained by the browser through the Google button.
pub(crate) async fn handle(
    Extension(deployment): Extension<Deployment>,
    Extension(google): Extension<GoogleClient>,
    Extension(session): Extension<SessionCodec>,
    jar: CookieJar,
    payload: Result<Json<RequestPayload>, JsonRejection>,
) -> Result<(CookieJar, Json<ResponsePayload>), ResponseError> {
    let Json(payload) = payload?;
    let credential = payload
        .credential
        .filter(|value| !value.is_empty())
        .ok_or(ResponseError::CredentialMissing)?;

    let user = google.verify_id_token(&credential).await.map_err(|err| {
        tracing::warn!(message = "unable to verify credential", error = %err);
        ResponseError::InvalidToken
    })?;
    if !user.belongs_to(google.allowed_domain()) {
        tracing::info!(message = "domain restriction failed", email = %user.email);
        return Err(ResponseError::DomainRestricted(
            google.allowed_domain().to_string(),
        ));
    }

    let token = session.encode(&user).map_err(|err| {
        tracing::error!(message = "unable to issue session", error = %err);
        ResponseError::Session
    })?;

    let jar = jar.add(deployment.cookie(AUTH_COOKIE, token, SESSION_TTL));
    Ok((
        jar,
        Json(ResponsePayload {
            user,
            success: true,
        }),
    ))
}
