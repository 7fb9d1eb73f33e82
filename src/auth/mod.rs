pub mod jwt;
pub mod store;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use store::IdentityStore;

/// Role string carried by identities with elevated tenant-scope rights.
pub const ADMIN_ROLE: &str = "admin";

/// The identity behind a connection. Resolved once at admission and
/// immutable for the connection's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Platform user id
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Role string ("admin", "manager", "employee", ...)
    pub role: String,
    /// Owning organization (tenant). Absent for platform-level accounts.
    pub organization_id: Option<String>,
}

impl Identity {
    /// Admins may join any organization room, not just their own.
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// Validate a handshake credential and resolve the identity it names.
///
/// Two gates, in order:
/// 1. The token must carry a valid, unexpired HS256 signature.
/// 2. The subject must still exist in the identity store — a token for a
///    deleted account is refused even while its signature is valid.
///
/// The store lookup is the only suspension point in the admission path.
/// No registry state is touched here; on failure the connection is simply
/// never admitted.
pub async fn authenticate(
    token: Option<&str>,
    secret: &[u8],
    store: &dyn IdentityStore,
) -> Result<Identity, AuthError> {
    let token = token.ok_or(AuthError::MissingCredential)?;

    let claims = jwt::validate_access_token(secret, token).map_err(|err| {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(err),
        }
    })?;

    let identity = store
        .lookup(&claims.sub)
        .await
        .map_err(|e| AuthError::StoreUnavailable(e.to_string()))?
        .ok_or(AuthError::UnknownIdentity)?;

    Ok(identity)
}
