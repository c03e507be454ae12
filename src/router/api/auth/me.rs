use axum::http::StatusCode;
use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;

use crate::entity::user::Entity as UserEntity;
use crate::router::api::error::Error;
use crate::service::session::{Codec as SessionCodec, AUTH_COOKIE};

#[derive(Debug, serde::Serialize)]
pub(crate) struct ResponsePayload {
    user: UserEntity,
}

pub(crate) async fn handle(
    Extension(session): Extension<SessionCodec>,
    jar: CookieJar,
) -> Result<Json<ResponsePayload>, Error> {
    jar.get(AUTH_COOKIE)
        .and_then(|cookie| session.decode(cookie.value()))
        .map(|user| Json(ResponsePayload { user }))
        .ok_or_else(|| Error::new(StatusCode::UNAUTHORIZED, "Not authenticated"))
}
