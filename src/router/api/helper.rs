use std::borrow::Cow;

use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Plain `302 Found` redirection, what browsers expect at the end of an OAuth step.
#[derive(Debug)]
pub(crate) struct Found(String);

impl Found {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }
}

impl IntoResponse for Found {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::FOUND, [(LOCATION, self.0)]).into_response()
    }
}

pub(crate) fn encode_url<'a>(path: &'a str, params: &[(&str, &str)]) -> Cow<'a, str> {
    if params.is_empty() {
        return Cow::Borrowed(path);
    }
    match serde_urlencoded::to_string(params) {
        Ok(values) => Cow::Owned(format!("{path}?{values}")),
        Err(err) => {
            tracing::error!(message = "unable to encode url params", error = %err);
            Cow::Borrowed(path)
        }
    }
}
