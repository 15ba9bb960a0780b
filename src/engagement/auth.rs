//! Resolved sign-in results handed over by the host after an external
//! provider flow finishes.

use serde::{Deserialize, Serialize};

use super::state::SignInMethod;

/// Identity returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    pub provider: SignInMethod,
}

/// Outcome of a provider sign-in attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<AuthUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthResult {
    pub fn succeeded(user: AuthUser) -> Self {
        Self {
            success: true,
            user: Some(user),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            user: None,
            error: Some(error.into()),
        }
    }

    /// The signed-in user, if the attempt actually produced one.
    pub fn signed_in_user(&self) -> Option<&AuthUser> {
        if self.success { self.user.as_ref() } else { None }
    }
}
