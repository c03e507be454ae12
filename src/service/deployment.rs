use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::helper::from_env_opt;

/// Origin used when the platform doesn't provide the public hostname.
pub(crate) const DEFAULT_BASE_URL: &str = "https://productisation.vercel.app";

const PRODUCTION: &str = "production";

#[derive(Debug, Default)]
pub(crate) struct Config {
    pub(crate) production: bool,
    pub(crate) public_host: Option<String>,
}

impl Config {
    /// Reads the hostname and environment exposed by Vercel.
    ///
    /// `PUBLIC_HOST` and `DEPLOYMENT_ENV` take precedence when defined.
    pub(crate) fn from_env() -> Self {
        let environment = from_env_opt("DEPLOYMENT_ENV").or_else(|| from_env_opt("VERCEL_ENV"));
        Self {
            production: environment.is_some_and(|value| value == PRODUCTION),
            public_host: from_env_opt("PUBLIC_HOST").or_else(|| from_env_opt("VERCEL_URL")),
        }
    }

    pub(crate) fn build(self) -> Deployment {
        let base_url = match self.public_host {
            Some(host) => format!("https://{}", host.trim_end_matches('/')),
            None => DEFAULT_BASE_URL.to_string(),
        };
        Deployment(Arc::new(Inner {
            production: self.production,
            base_url,
        }))
    }
}

#[derive(Debug)]
struct Inner {
    production: bool,
    base_url: String,
}

/// Where and how the service is exposed to browsers.
#[derive(Clone, Debug)]
pub(crate) struct Deployment(Arc<Inner>);

impl Deployment {
    pub fn is_production(&self) -> bool {
        self.0.production
    }

    pub fn base_url(&self) -> &str {
        self.0.base_url.as_str()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.0.base_url)
    }

    /// Builds a cookie readable by the whole site but hidden from scripts.
    ///
    /// The `Secure` attribute is only set in production, plain http is used locally.
    pub fn cookie(
        &self,
        name: &'static str,
        value: impl Into<String>,
        max_age: Duration,
    ) -> Cookie<'static> {
        Cookie::build((name, value.into()))
            .http_only(true)
            .secure(self.0.production)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(max_age)
            .build()
    }

    /// Builds a cookie instructing the browser to drop the previous one.
    pub fn expired_cookie(&self, name: &'static str) -> Cookie<'static> {
        self.cookie(name, "", Duration::ZERO)
    }
}
