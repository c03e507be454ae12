use std::collections::HashMap;

use axum::body::Body;
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::Response;
use axum_extra::extract::cookie::Cookie;
use http_body_util::BodyExt; // for `collect`


pub(crate) fn response_cookies(res: &Response<Body>) -> Vec<Cookie<'static>> {
    res.headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|value| Cookie::parse(value.to_str().unwrap().to_owned()).unwrap())
        .collect()
}

pub(crate) fn response_cookie(res: &Response<Body>, name: &str) -> Option<Cookie<'static>> {
    response_cookies(res)
        .into_iter()
        .find(|cookie| cookie.name() == name)
}

pub(crate) fn location(res: &Response<Body>) -> String {
    res.headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap()
        .to_string()
}

pub(crate) fn query_params(url: &str) -> HashMap<String, String> {
    let (_, query) = url.split_once('?').unwrap_or((url, ""));
    serde_urlencoded::from_str(query).unwrap()
}

pub(crate) async fn json_body(res: Response<Body>) -> serde_json::Value {
    let body = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}
