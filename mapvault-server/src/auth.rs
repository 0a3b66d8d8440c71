//! Bearer-token authentication.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use mapvault_core::{CredentialStore, OwnerId, StoreError};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::Instrument;

use crate::error::{ApiError, ApiResult};
use crate::handlers::blocking;
use crate::state::AppState;

/// Random bytes in an issued token.
const TOKEN_BYTES: usize = 32;

/// Authenticated request extension.
#[derive(Clone, Debug)]
pub struct AuthenticatedOwner(pub OwnerId);

/// Extract bearer token from Authorization header.
/// Per RFC 6750, the "Bearer" scheme is case-insensitive.
fn extract_bearer_token(req: &Request) -> Option<&str> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Hash a token for storage lookup.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Generate a fresh token for `owner`, store its digest, and return the raw
/// token. The raw value is never persisted.
pub fn issue_token(store: &dyn CredentialStore, owner: &OwnerId) -> Result<String, StoreError> {
    let mut bytes = [0_u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    store.register_token_digest(&hash_token(&token), owner)?;
    Ok(token)
}

/// Authentication middleware resolving the bearer token to an owner.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> ApiResult<Response> {
    let Some(token) = extract_bearer_token(&req) else {
        return Err(ApiError::Unauthorized);
    };
    let digest = hash_token(token);

    let credentials = state.credentials.clone();
    let owner = blocking(move || Ok(credentials.owner_for_token_digest(&digest)?))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let span = tracing::info_span!("request", owner = %owner);
    req.extensions_mut().insert(AuthenticatedOwner(owner));
    Ok(next.run(req).instrument(span).await)
}
