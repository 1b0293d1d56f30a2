//! Session gate for protected routes.
//!
//! Per request: pull the token from the `token` cookie, falling back to a
//! bearer `Authorization` header; verify it; re-fetch the user; attach the
//! resulting [`Identity`] to the request and run the inner handler exactly
//! once. Every failure path is a terminal 401 with the uniform envelope, and
//! no internal error detail ever reaches the client.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::error;

use super::token::TokenError;
use crate::error::ApiError;
use crate::server::AppState;

/// Cookie the session token travels in for browser clients.
pub const TOKEN_COOKIE: &str = "token";

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name {
                return Some(v[1..].to_string());
            }
        }
    }
    None
}

/// Token from the session cookie, else from `Authorization: Bearer <token>`
/// (mobile clients hold the token outside the cookie jar). An empty cookie,
/// as left behind by logout, counts as no token.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    if let Some(tok) = parse_cookie(headers, TOKEN_COOKIE) {
        if !tok.is_empty() {
            return Some(tok);
        }
    }
    let auth = headers.get("authorization")?.to_str().ok()?;
    let tok = auth.strip_prefix("Bearer ")?.trim();
    if tok.is_empty() { None } else { Some(tok.to_string()) }
}

pub async fn require_session(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(token) = bearer_token(req.headers()) else {
        return ApiError::authorization("Not authorized, no token").into_response();
    };
    let claims = match state.tokens.verify(&token) {
        Ok(c) => c,
        Err(TokenError::Expired) => return ApiError::authorization("Token expired").into_response(),
        Err(TokenError::Invalid) => return ApiError::authorization("Invalid token").into_response(),
    };
    let identity = match state.store.find_identity(claims.sub).await {
        Ok(Some(identity)) => identity,
        Ok(None) => return ApiError::authorization("Not authorized, user not found").into_response(),
        Err(e) => {
            // Collapse to a generic 401; the cause stays in the log.
            error!("session lookup failed: {e}");
            return ApiError::authorization("Not authorized").into_response();
        }
    };
    req.extensions_mut().insert(identity);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut h = HeaderMap::new();
        for (k, v) in pairs {
            h.append(*k, HeaderValue::from_str(v).unwrap());
        }
        h
    }

    #[test]
    fn cookie_wins_over_header() {
        let h = headers(&[("cookie", "token=from-cookie"), ("authorization", "Bearer from-header")]);
        assert_eq!(bearer_token(&h).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn falls_back_to_bearer_header() {
        let h = headers(&[("authorization", "Bearer abc.def.ghi")]);
        assert_eq!(bearer_token(&h).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn cleared_cookie_counts_as_no_token() {
        let h = headers(&[("cookie", "token=")]);
        assert_eq!(bearer_token(&h), None);
    }

    #[test]
    fn cookie_is_found_among_others() {
        let h = headers(&[("cookie", "theme=dark; token=t1; lang=en")]);
        assert_eq!(bearer_token(&h).as_deref(), Some("t1"));
    }

    #[test]
    fn non_bearer_authorization_is_ignored() {
        let h = headers(&[("authorization", "Basic dXNlcjpwdw==")]);
        assert_eq!(bearer_token(&h), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
