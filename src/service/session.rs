use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::entity::user::Entity as UserEntity;
use crate::helper::from_env_opt;

pub(crate) const AUTH_COOKIE: &str = "auth-token";

// 7 days
pub(crate) const SESSION_TTL: time::Duration = time::Duration::days(7);

#[derive(Debug, Default)]
pub(crate) struct Config {
    secret: Option<String>,
}

impl Config {
    pub(crate) fn from_env() -> Self {
        Self {
            secret: from_env_opt("JWT_SECRET"),
        }
    }

    pub(crate) fn build(self) -> Codec {
        Codec(self.secret.map(|secret| {
            Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            })
        }))
    }
}

#[cfg(test)]
impl Config {
    pub(crate) fn test() -> Self {
        Self {
            secret: Some("session-secret-for-tests".into()),
        }
    }

    pub(crate) fn disabled() -> Self {
        Self { secret: None }
    }
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
struct Claims {
    #[serde(flatten)]
    user: UserEntity,
    iat: i64,
    exp: i64,
}

#[derive(Debug)]
pub(crate) enum SessionError {
    NotConfigured,
    Encoding(jsonwebtoken::errors::Error),
}

impl std::error::Error for SessionError {}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured => f.write_str("session secret not configured"),
            Self::Encoding(inner) => write!(f, "unable to sign session: {inner}"),
        }
    }
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Signs and verifies the session token stored in the `auth-token` cookie.
#[derive(Clone)]
pub(crate) struct Codec(Option<Arc<Keys>>);

impl Codec {
    pub fn is_enabled(&self) -> bool {
        self.0.is_some()
    }

    pub fn encode(&self, user: &UserEntity) -> Result<String, SessionError> {
        let keys = self.0.as_deref().ok_or(SessionError::NotConfigured)?;
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            user: user.clone(),
            iat: now,
            exp: now + SESSION_TTL.whole_seconds(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(SessionError::Encoding)
    }

    /// Returns the user when the token is properly signed and not expired.
    pub fn decode(&self, token: &str) -> Option<UserEntity> {
        let keys = self.0.as_deref()?;
        let validation = Validation::new(Algorithm::HS256);
        match jsonwebtoken::decode::<Claims>(token, &keys.decoding, &validation) {
            Ok(data) => Some(data.claims.user),
            Err(err) => {
                tracing::debug!(message = "rejected session token", error = %err);
                None
            }
        }
    }
}
