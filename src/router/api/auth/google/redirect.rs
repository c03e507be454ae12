use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Extension;
use axum_extra::extract::cookie::CookieJar;

use crate::router::api::error::Error;
use crate::router::api::helper::Found;
use crate::service::deployment::Deployment;
use crate::service::google::Client as GoogleClient;
use crate::service::token::Generator;

pub(crate) const STATE_COOKIE: &str = "oauth-state";

// 10 minutes
pub(crate) const STATE_TTL: time::Duration = time::Duration::seconds(600);

const STATE_LENGTH: usize = 32;

#[derive(Debug)]
pub(crate) enum ResponseError {
    ClientIdMissing,
    UnableToBuildUrl,
}

impl ResponseError {
    fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self {
            Self::ClientIdMissing => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "GOOGLE_CLIENT_ID not configured",
            ),
            Self::UnableToBuildUrl => (StatusCode::INTERNAL_SERVER_ERROR, "something went wrong"),
        }
    }
}

impl IntoResponse for ResponseError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = self.status_and_message();
        Error::new(status, message).into_response()
    }
}

/// Starts the authorization code flow, binding a fresh state to the browser.
pub(crate) async fn handle(
    Extension(deployment): Extension<Deployment>,
    Extension(google): Extension<GoogleClient>,
    Extension(tokens): Extension<Generator>,
    jar: CookieJar,
) -> Result<(CookieJar, Found), ResponseError> {
    let client_id = google.client_id().ok_or(ResponseError::ClientIdMissing)?;

    let state = tokens.generate(STATE_LENGTH);
    let url = google.authorization_url(client_id, &state).map_err(|err| {
        tracing::error!(message = "unable to build authorization url", error = %err);
        ResponseError::UnableToBuildUrl
    })?;

    tracing::debug!("redirecting to google consent page");
    let jar = jar.add(deployment.cookie(STATE_COOKIE, state, STATE_TTL));
    Ok((jar, Found::new(url)))
}
