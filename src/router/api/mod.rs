use axum::routing::get;

mod auth;
mod error;
mod helper;
mod status;

pub(super) fn router() -> axum::Router {
    axum::Router::new()
        .route("/status", get(status::handle))
        .nest("/auth", auth::router())
}
