//! Bearer token attachment.

use roster_domain::ApiRequest;

/// Header that carries the access token.
pub const AUTHORIZATION: &str = "Authorization";

/// Formats a bearer credential.
#[must_use]
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Returns a copy of `request` carrying `token` as a bearer credential.
///
/// An empty token leaves the request unsigned. Any `Authorization` header
/// already present is replaced, so re-signing a retry never stacks
/// credentials.
#[must_use]
pub fn sign(request: &ApiRequest, token: &str) -> ApiRequest {
    let mut signed = request.clone();
    if !token.is_empty() {
        signed.headers.set(AUTHORIZATION, bearer(token));
    }
    signed
}
