//! External store interfaces: identity verification and profile reads

use async_trait::async_trait;

use crate::{HealthProfile, Result};

/// Resolves a caller identity from an opaque auth token.
///
/// Token issuance and verification belong to an external identity
/// provider; this seam only maps a presented token to the identity the
/// admission controller and generators key state by.
#[async_trait]
pub trait IdentityVerifier: Send + Sync + 'static {
    /// Verify a bearer token, returning the caller's user id.
    ///
    /// Fails with `Error::Unauthorized` for unknown or malformed tokens.
    async fn verify(&self, token: &str) -> Result<String>;
}

/// Read-only view of the external user document store, consulted only to
/// enrich generation requests with a health profile.
#[async_trait]
pub trait ProfileStore: Send + Sync + 'static {
    /// Fetch the profile for a user, if one exists
    async fn fetch(&self, user_id: &str) -> Result<Option<HealthProfile>>;
}
