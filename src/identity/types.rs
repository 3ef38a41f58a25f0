use serde::{Deserialize, Serialize};

/// Claims carried by an identity token: the authenticated
/// `(user_id, display_name)` pair the gateway trusts as given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Durable user id
    pub sub: String,
    /// Display identity shown to other users
    pub name: String,
    pub exp: usize,
    pub iat: usize,
}
