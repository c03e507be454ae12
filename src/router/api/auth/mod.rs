use axum::routing::{get, post};

use super::error::method_not_allowed;

mod google;
mod logout;
mod me;

pub(super) fn router() -> axum::Router {
    axum::Router::new()
        .route(
            "/google",
            post(google::login::handle).fallback(method_not_allowed),
        )
        .route(
            "/google/redirect",
            // axum serves HEAD with the GET handler, which would set the state cookie
            get(google::redirect::handle)
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
        .route(
            "/google/callback",
            get(google::callback::handle).fallback(method_not_allowed),
        )
        .route("/me", get(me::handle).fallback(method_not_allowed))
        .route("/logout", post(logout::handle).fallback(method_not_allowed))
}
