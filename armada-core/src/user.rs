use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account status. Only `Active` users pass authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Suspended,
}

impl Default for UserStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// An end-user of the proxy fleet.
///
/// The password is stored only as a bcrypt hash and never serialized
/// into API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,

    /// Globally unique login name.
    pub username: String,

    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Quota in bytes.
    #[serde(default)]
    pub data_limit: i64,

    /// Bytes consumed so far. Monotonically non-decreasing.
    #[serde(default)]
    pub data_used: i64,

    /// Pool names this user may route through, in preference order.
    #[serde(default)]
    pub allowed_pools: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_whitelist: Vec<String>,

    #[serde(default)]
    pub status: UserStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── Wire DTOs ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub data_limit: i64,
    #[serde(default)]
    pub allowed_pools: Vec<String>,
    #[serde(default)]
    pub ip_whitelist: Vec<String>,
}

/// Sparse PUT body — only the present fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub password: Option<String>,
    pub data_limit: Option<i64>,
    pub allowed_pools: Option<Vec<String>>,
    pub ip_whitelist: Option<Vec<String>>,
    pub status: Option<UserStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_pools: Vec<String>,
    #[serde(default)]
    pub data_limit: i64,
    #[serde(default)]
    pub data_used: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl AuthResponse {
    pub fn granted(user: &User) -> Self {
        Self {
            success: true,
            user_id: user.id.clone(),
            allowed_pools: user.allowed_pools.clone(),
            data_limit: user.data_limit,
            data_used: user.data_used,
            message: String::new(),
        }
    }

    pub fn denied(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn over_quota(&self) -> bool {
        self.data_used >= self.data_limit
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageReport {
    pub user_id: String,
    pub bytes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub user_id: String,
    pub upstream: String,
    pub country: String,
    #[serde(rename = "issticky")]
    pub is_sticky: bool,
}
