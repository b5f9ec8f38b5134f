use chrono::{Duration, Utc};
use entity::user;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "crm_session";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub session_ttl_minutes: i64,
}

impl AuthConfig {
    pub fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.jwt_secret.as_bytes())
    }

    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.jwt_secret.as_bytes())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

/// Closed role set; every authorization decision derives from it.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub enum UserRole {
    SalesExecutive,
    SalesManager,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::SalesExecutive => "sales_executive",
            UserRole::SalesManager => "sales_manager",
            UserRole::Admin => "admin",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "sales_executive" => Some(UserRole::SalesExecutive),
            "sales_manager" => Some(UserRole::SalesManager),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }

    pub fn level(self) -> u8 {
        match self {
            UserRole::SalesExecutive => 1,
            UserRole::SalesManager => 2,
            UserRole::Admin => 3,
        }
    }
}

impl From<user::Role> for UserRole {
    fn from(value: user::Role) -> Self {
        match value {
            user::Role::SalesExecutive => UserRole::SalesExecutive,
            user::Role::SalesManager => UserRole::SalesManager,
            user::Role::Admin => UserRole::Admin,
        }
    }
}

impl From<UserRole> for user::Role {
    fn from(value: UserRole) -> Self {
        match value {
            UserRole::SalesExecutive => user::Role::SalesExecutive,
            UserRole::SalesManager => user::Role::SalesManager,
            UserRole::Admin => user::Role::Admin,
        }
    }
}

/// Resolved actor attached to every request by the server boundary.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn has_role(&self, role: UserRole) -> bool {
        self.role.level() >= role.level()
    }

    pub fn is_sales_executive(&self) -> bool {
        self.role == UserRole::SalesExecutive
    }

    pub fn is_manager_or_admin(&self) -> bool {
        self.has_role(UserRole::SalesManager)
    }
}

pub fn issue_token(
    user_id: Uuid,
    role: UserRole,
    config: &AuthConfig,
) -> jsonwebtoken::errors::Result<String> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(Duration::minutes(config.session_ttl_minutes))
        .unwrap_or(now)
        .timestamp() as usize;
    let claims = SessionClaims {
        sub: user_id,
        role: role.as_str().to_string(),
        exp,
        iat: now.timestamp() as usize,
    };
    jsonwebtoken::encode(&Header::default(), &claims, &config.encoding_key())
}

pub fn decode_token(
    token: &str,
    config: &AuthConfig,
) -> jsonwebtoken::errors::Result<SessionClaims> {
    jsonwebtoken::decode::<SessionClaims>(token, &config.decoding_key(), &Validation::default())
        .map(|data| data.claims)
}
