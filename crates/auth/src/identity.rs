use serde::{Deserialize, Serialize};

use tukangin_core::UserId;

use crate::JwtClaims;

/// Identity resolved once per request by the identity provider.
///
/// Threaded explicitly into every operation; never stored globally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            email: None,
            display_name: None,
        }
    }
}

impl From<&JwtClaims> for Identity {
    fn from(claims: &JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email.clone(),
            display_name: claims.name.clone(),
        }
    }
}
