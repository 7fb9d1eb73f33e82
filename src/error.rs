use thiserror::Error;

/// Authentication failures refuse the connection attempt outright.
/// No registry or room state exists yet when these fire, so there is
/// nothing to roll back.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token in the query string and no cookie fallback.
    /// Anonymous connections are not permitted.
    #[error("no credential supplied")]
    MissingCredential,

    /// Token signature is valid but the token has expired.
    #[error("token expired")]
    TokenExpired,

    /// Token failed signature or structural validation.
    #[error("token invalid")]
    TokenInvalid(#[source] jsonwebtoken::errors::Error),

    /// Token is valid but its subject no longer exists in the identity
    /// store (e.g. the account was deleted after the token was issued).
    #[error("identity no longer exists")]
    UnknownIdentity,

    /// The identity store itself failed to answer.
    #[error("identity store unavailable: {0}")]
    StoreUnavailable(String),
}

/// WebSocket close codes sent on refused connections:
/// 4001 = token expired
/// 4002 = token invalid or missing
/// 4003 = identity unknown or unverifiable
pub const CLOSE_TOKEN_EXPIRED: u16 = 4001;
pub const CLOSE_TOKEN_INVALID: u16 = 4002;
pub const CLOSE_UNKNOWN_IDENTITY: u16 = 4003;

impl AuthError {
    /// Map the failure to a transport close code. The code is all the
    /// client gets; the reason string stays server-side.
    pub fn close_code(&self) -> u16 {
        match self {
            AuthError::TokenExpired => CLOSE_TOKEN_EXPIRED,
            AuthError::MissingCredential | AuthError::TokenInvalid(_) => CLOSE_TOKEN_INVALID,
            AuthError::UnknownIdentity | AuthError::StoreUnavailable(_) => CLOSE_UNKNOWN_IDENTITY,
        }
    }
}
