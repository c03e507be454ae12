use axum::extract::rejection::QueryRejection;
use axum::extract::Query;
use axum::response::IntoResponse;
use axum::Extension;
use axum_extra::extract::cookie::CookieJar;

use super::redirect::STATE_COOKIE;
use crate::router::api::helper::{encode_url, Found};
use crate::service::deployment::Deployment;
use crate::service::google::Client as GoogleClient;
use crate::service::session::{Codec as SessionCodec, AUTH_COOKIE, SESSION_TTL};

const LOGIN_PATH: &str = "/login";

#[derive(Debug)]
pub(crate) enum ResponseError {
    InvalidRequest,
    Provider(String),
    CodeMissing,
    NotConfigured,
    InvalidState,
    TokenExchange,
    IdTokenMissing,
    InvalidToken,
    DomainRestricted,
    Session,
}

impl ResponseError {
    fn code(&self) -> &str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::Provider(inner) => inner.as_str(),
            Self::CodeMissing => "no_code",
            Self::NotConfigured => "config_error",
            Self::InvalidState => "invalid_state",
            Self::TokenExchange => "token_exchange_failed",
            Self::IdTokenMissing => "no_id_token",
            Self::InvalidToken => "invalid_token",
            Self::DomainRestricted => "domain_restricted",
            Self::Session => "session_error",
        }
    }
}

impl From<QueryRejection> for ResponseError {
    fn from(value: QueryRejection) -> Self {
        tracing::warn!(message = "failed decoding callback query", cause = %value);
        Self::InvalidRequest
    }
}

impl IntoResponse for ResponseError {
    fn into_response(self) -> axum::response::Response {
        Found::new(encode_url(LOGIN_PATH, &[("error", self.code())])).into_response()
    }
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct QueryParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|inner| !inner.is_empty())
}

async fn authenticate(
    google: &GoogleClient,
    session: &SessionCodec,
    expected_state: Option<&str>,
    params: QueryParams,
) -> Result<String, ResponseError> {
    if let Some(error) = non_empty(params.error) {
        tracing::warn!(message = "google refused the authorization", error = %error);
        return Err(ResponseError::Provider(error));
    }
    let code = non_empty(params.code).ok_or(ResponseError::CodeMissing)?;
    if !google.is_configured() {
        tracing::error!("google client id or secret not configured");
        return Err(ResponseError::NotConfigured);
    }

    let given_state = non_empty(params.state);
    match (expected_state, given_state.as_deref()) {
        (Some(expected), Some(given)) if crate::service::token::matches(expected, given) => {}
        (expected, given) => {
            tracing::warn!(
                message = "state mismatch",
                has_cookie = expected.is_some(),
                has_state = given.is_some()
            );
            return Err(ResponseError::InvalidState);
        }
    }

    let tokens = google.exchange_code(&code).await.map_err(|err| {
        tracing::error!(message = "unable to exchange authorization code", error = %err);
        ResponseError::TokenExchange
    })?;
    let id_token = tokens.id_token.ok_or_else(|| {
        tracing::error!("no id token in google response");
        ResponseError::IdTokenMissing
    })?;
    let user = google.verify_id_token(&id_token).await.map_err(|err| {
        tracing::error!(message = "unable to verify id token", error = %err);
        ResponseError::InvalidToken
    })?;

    if !user.belongs_to(google.allowed_domain()) {
        tracing::info!(message = "domain restriction failed", email = %user.email);
        return Err(ResponseError::DomainRestricted);
    }

    session.encode(&user).map_err(|err| {
        tracing::error!(message = "unable to issue session", error = %err);
        ResponseError::Session
    })
}

/// Completes the authorization code flow started by the redirect.
///
/// The state cookie is expired on every outcome so it can't be replayed.
pub(crate) async fn handle(
    Extension(deployment): Extension<Deployment>,
    Extension(google): Extension<GoogleClient>,
    Extension(session): Extension<SessionCodec>,
    jar: CookieJar,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> (CookieJar, axum::response::Response) {
    let expected_state = jar
        .get(STATE_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .filter(|value| !value.is_empty());
    let jar = jar.add(deployment.expired_cookie(STATE_COOKIE));

    let outcome = match params {
        Ok(Query(params)) => {
            authenticate(&google, &session, expected_state.as_deref(), params).await
        }
        Err(rejection) => Err(ResponseError::from(rejection)),
    };
    match outcome {
        Ok(token) => {
            tracing::debug!("user authenticated");
            let jar = jar.add(deployment.cookie(AUTH_COOKIE, token, SESSION_TTL));
            (jar, Found::new("/").into_response())
        }
        Err(err) => (jar, err.into_response()),
    }
}

#[cfg(test)]
mod integration_tests {
    use axum::body::Body;
    use axum::http::header::COOKIE;
    use axum::http::{Request, StatusCode};
    use mockito::{Matcher, Mock, ServerGuard};

    use crate::app::{Application, Config};
    use crate::test::{location, query_params, response_cookie};

    const STATE: &str = "expected-state-value";

    fn application(server: &ServerGuard) -> Application {
        Config::test()
            .with_google(crate::service::google::Config::test().with_base_url(&server.url()))
            .build()
            .unwrap()
    }

    fn request(query: &str, state_cookie: Option<&str>) -> Request<Body> {
        let builder = Request::builder()
            .uri(format!("/api/auth/google/callback?{query}"))
            .method("GET");
        let builder = match state_cookie {
            Some(value) => builder.header(COOKIE, format!("oauth-state={value}")),
            None => builder,
        };
        builder.body(Body::empty()).unwrap()
    }

    async fn mock_token(server: &mut ServerGuard, body: &str) -> Mock {
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    async fn mock_token_info(server: &mut ServerGuard, email: &str) -> Mock {
        server
            .mock("GET", "/tokeninfo")
            .match_query(Matcher::UrlEncoded("id_token".into(), "identity".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"aud":"abc123","email":"{email}","email_verified":"true","name":"Alice","picture":"https://example.com/alice.png"}}"#
            ))
            .create_async()
            .await
    }

    fn assert_login_error(res: &axum::http::Response<Body>, expected: &str) {
        assert_eq!(res.status(), StatusCode::FOUND);
        let location = location(res);
        assert!(location.starts_with("/login?"), "{location}");
        assert_eq!(query_params(&location).get("error").unwrap(), expected);
    }

    fn assert_state_expired(res: &axum::http::Response<Body>) {
        let cookie = response_cookie(res, "oauth-state").unwrap();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[tokio::test]
    async fn should_authenticate_user() {
        crate::enable_test_tracing();
        let mut server = mockito::Server::new_async().await;
        let token = mock_token(
            &mut server,
            r#"{"access_token":"access","id_token":"identity"}"#,
        )
        .await;
        let info = mock_token_info(&mut server, "alice@creode.co.uk").await;
        let app = application(&server);

        let res = app
            .handle(request(&format!("code=the-code&state={STATE}"), Some(STATE)))
            .await;
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(location(&res), "/");
        assert_state_expired(&res);

        let cookie = response_cookie(&res, "auth-token").unwrap();
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(7)));
        let user = app.session().decode(cookie.value()).unwrap();
        assert_eq!(user.email, "alice@creode.co.uk");
        assert_eq!(user.name.as_deref(), Some("Alice"));

        token.assert_async().await;
        info.assert_async().await;
    }

    #[tokio::test]
    async fn should_forward_provider_error() {
        crate::enable_test_tracing();
        let server = mockito::Server::new_async().await;
        let app = application(&server);

        let res = app
            .handle(request(&format!("error=access_denied&state={STATE}"), Some(STATE)))
            .await;
        assert_login_error(&res, "access_denied");
        assert_state_expired(&res);
        assert!(response_cookie(&res, "auth-token").is_none());
    }

    #[tokio::test]
    async fn should_fail_without_code() {
        crate::enable_test_tracing();
        let server = mockito::Server::new_async().await;
        let app = application(&server);

        let res = app.handle(request(&format!("state={STATE}"), Some(STATE))).await;
        assert_login_error(&res, "no_code");
    }

    #[tokio::test]
    async fn should_redirect_on_malformed_query() {
        crate::enable_test_tracing();
        let mut server = mockito::Server::new_async().await;
        let token = server
            .mock("POST", "/token")
            .expect(0)
            .create_async()
            .await;
        let app = application(&server);

        let res = app
            .handle(request(&format!("code=a&code=b&state={STATE}"), Some(STATE)))
            .await;
        assert_login_error(&res, "invalid_request");
        assert_state_expired(&res);
        assert!(response_cookie(&res, "auth-token").is_none());
        token.assert_async().await;
    }

    #[tokio::test]
    async fn should_fail_without_client_secret() {
        crate::enable_test_tracing();
        let app = Config::test()
            .with_google(crate::service::google::Config::test().without_client_secret())
            .build()
            .unwrap();

        let res = app
            .handle(request(&format!("code=the-code&state={STATE}"), Some(STATE)))
            .await;
        assert_login_error(&res, "config_error");
    }

    #[tokio::test]
    async fn should_reject_mismatching_state() {
        crate::enable_test_tracing();
        let mut server = mockito::Server::new_async().await;
        let token = server
            .mock("POST", "/token")
            .expect(0)
            .create_async()
            .await;
        let app = application(&server);

        let res = app
            .handle(request("code=the-code&state=forged-state", Some(STATE)))
            .await;
        assert_login_error(&res, "invalid_state");
        assert_state_expired(&res);
        token.assert_async().await;
    }

    #[tokio::test]
    async fn should_reject_missing_state_cookie() {
        crate::enable_test_tracing();
        let server = mockito::Server::new_async().await;
        let app = application(&server);

        let res = app
            .handle(request(&format!("code=the-code&state={STATE}"), None))
            .await;
        assert_login_error(&res, "invalid_state");
    }

    #[tokio::test]
    async fn should_reject_missing_state_param() {
        crate::enable_test_tracing();
        let server = mockito::Server::new_async().await;
        let app = application(&server);

        let res = app.handle(request("code=the-code", Some(STATE))).await;
        assert_login_error(&res, "invalid_state");
    }

    #[tokio::test]
    async fn should_report_failed_exchange() {
        crate::enable_test_tracing();
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;
        let app = application(&server);

        let res = app
            .handle(request(&format!("code=the-code&state={STATE}"), Some(STATE)))
            .await;
        assert_login_error(&res, "token_exchange_failed");
    }

    #[tokio::test]
    async fn should_fail_without_id_token() {
        crate::enable_test_tracing();
        let mut server = mockito::Server::new_async().await;
        let _token = mock_token(&mut server, r#"{"access_token":"access"}"#).await;
        let app = application(&server);

        let res = app
            .handle(request(&format!("code=the-code&state={STATE}"), Some(STATE)))
            .await;
        assert_login_error(&res, "no_id_token");
    }

    #[tokio::test]
    async fn should_reject_invalid_id_token() {
        crate::enable_test_tracing();
        let mut server = mockito::Server::new_async().await;
        let _token = mock_token(&mut server, r#"{"id_token":"identity"}"#).await;
        let _info = server
            .mock("GET", "/tokeninfo")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":"invalid_token"}"#)
            .create_async()
            .await;
        let app = application(&server);

        let res = app
            .handle(request(&format!("code=the-code&state={STATE}"), Some(STATE)))
            .await;
        assert_login_error(&res, "invalid_token");
    }

    #[tokio::test]
    async fn should_restrict_domain() {
        crate::enable_test_tracing();
        let mut server = mockito::Server::new_async().await;
        let _token = mock_token(&mut server, r#"{"id_token":"identity"}"#).await;
        let _info = mock_token_info(&mut server, "mallory@gmail.com").await;
        let app = application(&server);

        let res = app
            .handle(request(&format!("code=the-code&state={STATE}"), Some(STATE)))
            .await;
        assert_login_error(&res, "domain_restricted");
        assert!(response_cookie(&res, "auth-token").is_none());
    }

    #[tokio::test]
    async fn should_fail_without_session_secret() {
        crate::enable_test_tracing();
        let mut server = mockito::Server::new_async().await;
        let _token = mock_token(&mut server, r#"{"id_token":"identity"}"#).await;
        let _info = mock_token_info(&mut server, "alice@creode.co.uk").await;
        let app = Config::test()
            .with_google(crate::service::google::Config::test().with_base_url(&server.url()))
            .with_session(crate::service::session::Config::disabled())
            .build()
            .unwrap();

        let res = app
            .handle(request(&format!("code=the-code&state={STATE}"), Some(STATE)))
            .await;
        assert_login_error(&res, "session_error");
    }

    #[tokio::test]
    async fn should_flag_cookies_secure_in_production() {
        crate::enable_test_tracing();
        let mut server = mockito::Server::new_async().await;
        let _token = mock_token(&mut server, r#"{"id_token":"identity"}"#).await;
        let _info = mock_token_info(&mut server, "alice@creode.co.uk").await;
        let app = Config::test()
            .with_production(true)
            .with_google(crate::service::google::Config::test().with_base_url(&server.url()))
            .build()
            .unwrap();

        let res = app
            .handle(request(&format!("code=the-code&state={STATE}"), Some(STATE)))
            .await;
        assert_eq!(location(&res), "/");
        let auth = response_cookie(&res, "auth-token").unwrap();
        assert_eq!(auth.secure(), Some(true));
        let state = response_cookie(&res, "oauth-state").unwrap();
        assert_eq!(state.secure(), Some(true));
    }
}
