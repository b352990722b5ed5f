//! Claims carried by bearer tokens from the external auth provider

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{config::AuthConfig, error::AppError};

/// JWT claims. Tokens are issued and signed by the auth provider; the server only verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
}

fn default_role() -> String {
    "anon".to_string()
}

impl SessionClaims {
    /// Sign claims (used by tooling and tests standing in for the provider)
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Verify and decode a token
    pub fn from_token(token: &str, auth: &AuthConfig) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let mut validation = Validation::default();
        match auth.audience {
            Some(ref aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(auth.jwt_secret.as_bytes()),
            &validation,
        )?;
        Ok(token_data.claims)
    }

    /// Whether this caller may mutate catalog and circulation state
    pub fn is_admin(&self, auth: &AuthConfig) -> bool {
        auth.admin_roles.iter().any(|r| r == &self.role)
    }

    pub fn require_admin(&self, auth: &AuthConfig) -> Result<(), AppError> {
        if self.is_admin(auth) {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Library staff privileges required".to_string(),
            ))
        }
    }
}

/// Which surface the client should show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SessionView {
    Public,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionInfo {
    pub authenticated: bool,
    pub view: SessionView,
    pub email: Option<String>,
}

impl SessionInfo {
    pub fn resolve(claims: Option<&SessionClaims>, auth: &AuthConfig) -> Self {
        match claims {
            Some(c) => SessionInfo {
                authenticated: true,
                view: if c.is_admin(auth) {
                    SessionView::Admin
                } else {
                    SessionView::Public
                },
                email: c.email.clone(),
            },
            None => SessionInfo {
                authenticated: false,
                view: SessionView::Public,
                email: None,
            },
        }
    }
}
