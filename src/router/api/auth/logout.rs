use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;

use crate::service::deployment::Deployment;
use crate::service::session::AUTH_COOKIE;

#[derive(Debug, serde::Serialize)]
pub(crate) struct ResponsePayload {
    success: bool,
}

pub(crate) async fn handle(
    Extension(deployment): Extension<Deployment>,
    jar: CookieJar,
) -> (CookieJar, Json<ResponsePayload>) {
    (
        jar.add(deployment.expired_cookie(AUTH_COOKIE)),
        Json(ResponsePayload { success: true }),
    )
}
