use axum::Extension;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::helper::parse_env_or;
use crate::service::token::Generator;

pub(crate) struct Config {
    host: std::net::IpAddr,
    port: u16,

    deployment: crate::service::deployment::Config,
    google: crate::service::google::Config,
    session: crate::service::session::Config,
    tokens: Generator,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: parse_env_or("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)))?,
            port: parse_env_or("PORT", 3010)?,

            deployment: crate::service::deployment::Config::from_env(),
            google: crate::service::google::Config::from_env(),
            session: crate::service::session::Config::from_env(),
            tokens: Generator::random(),
        })
    }

    pub fn build(self) -> anyhow::Result<Application> {
        let deployment = self.deployment.build();
        tracing::info!(
            message = "serving authentication",
            base_url = deployment.base_url(),
            production = deployment.is_production()
        );
        let google = self.google.build(&deployment)?;
        if google.client_id().is_none() {
            tracing::warn!("GOOGLE_CLIENT_ID is not defined, authentication will be refused");
        }
        let session = self.session.build();
        if !session.is_enabled() {
            tracing::warn!("JWT_SECRET is not defined, no session will be issued");
        }

        Ok(Application {
            socket_address: SocketAddr::from((self.host, self.port)),
            deployment,
            google,
            session,
            tokens: self.tokens,
        })
    }
}

pub(crate) struct Application {
    socket_address: SocketAddr,
    deployment: crate::service::deployment::Deployment,
    google: crate::service::google::Client,
    session: crate::service::session::Codec,
    tokens: Generator,
}

impl Application {
    fn router(&self) -> axum::Router {
        crate::router::create()
            .layer(Extension(self.deployment.clone()))
            .layer(Extension(self.google.clone()))
            .layer(Extension(self.session.clone()))
            .layer(Extension(self.tokens.clone()))
            .layer(TraceLayer::new_for_http())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        tracing::debug!("binding socket to {}", self.socket_address);
        let listener = TcpListener::bind(self.socket_address).await?;
        tracing::info!("listening on {}", self.socket_address);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

#[cfg(test)]
impl Config {
    pub(crate) fn test() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 8080,
            deployment: crate::service::deployment::Config::default(),
            google: crate::service::google::Config::test(),
            session: crate::service::session::Config::test(),
            tokens: Generator::fixed(crate::service::token::FIXED_TOKEN),
        }
    }

    pub(crate) fn with_production(mut self, production: bool) -> Self {
        self.deployment.production = production;
        self
    }

    pub(crate) fn with_public_host(mut self, host: &str) -> Self {
        self.deployment.public_host = Some(host.to_string());
        self
    }

    pub(crate) fn with_google(mut self, google: crate::service::google::Config) -> Self {
        self.google = google;
        self
    }

    pub(crate) fn with_session(mut self, session: crate::service::session::Config) -> Self {
        self.session = session;
        self
    }

    pub(crate) fn with_tokens(mut self, tokens: Generator) -> Self {
        self.tokens = tokens;
        self
    }
}

#[cfg(test)]
impl Application {
    pub(crate) fn test() -> Self {
        Config::test().build().unwrap()
    }

    pub(crate) fn session(&self) -> &crate::service::session::Codec {
        &self.session
    }

    pub(crate) async fn handle(
        &self,
        req: axum::http::Request<axum::body::Body>,
    ) -> axum::http::Response<axum::body::Body> {
        use tower::ServiceExt;

        self.router().oneshot(req).await.unwrap()
    }
}
