//! Kubernetes `TokenReview` webhook adapter
//!
//! The API server posts a `TokenReview` whose `spec.token` holds the bearer
//! token presented by a client, and expects the same object back with a
//! `status` saying whether, and as whom, the client is authenticated.
//!
//! ```json
//! {
//!   "apiVersion": "authentication.k8s.io/v1",
//!   "kind": "TokenReview",
//!   "status": {
//!     "authenticated": true,
//!     "user": { "uid": "u1", "username": "alice", "groups": ["eng", "sre"] }
//!   }
//! }
//! ```

use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use crate::claims::Identity;
use crate::verifier::VerifyToken;

pub const API_VERSION: &str = "authentication.k8s.io/v1";
pub const KIND: &str = "TokenReview";

/// Message returned for every rejected token, whatever the reason
pub const REJECTED: &str = "token rejected";

/// Incoming review request; fields other than `spec.token` are ignored
#[derive(Debug, Clone, Deserialize)]
pub struct TokenReviewRequest {
    pub spec: TokenReviewSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenReviewSpec {
    pub token: String,
}

/// Review response returned to the API server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenReview {
    pub api_version: String,
    pub kind: String,
    pub status: TokenReviewStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenReviewStatus {
    pub authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub uid: String,
    pub username: String,
    pub groups: Vec<String>,
}

impl From<Identity> for UserInfo {
    fn from(identity: Identity) -> Self {
        Self {
            uid: identity.uid,
            username: identity.username,
            groups: identity.groups,
        }
    }
}

impl TokenReview {
    pub fn authenticated(identity: Identity) -> Self {
        Self::with_status(TokenReviewStatus {
            authenticated: true,
            user: Some(identity.into()),
            error: None,
        })
    }

    pub fn unauthenticated(error: impl Into<String>) -> Self {
        Self::with_status(TokenReviewStatus {
            authenticated: false,
            user: None,
            error: Some(error.into()),
        })
    }

    fn with_status(status: TokenReviewStatus) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            status,
        }
    }
}

/// Answer a raw `TokenReview` request body
///
/// Never fails: an undecodable body or a rejected token both produce an
/// unauthenticated review. The reason a token was rejected is only logged;
/// the review carries the same message for every rejection.
pub fn review<V: VerifyToken + ?Sized>(verifier: &V, body: &[u8]) -> TokenReview {
    let request: TokenReviewRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => {
            info!(error = %e, "rejecting undecodable token review");
            return TokenReview::unauthenticated(format!("decode request body: {e}"));
        }
    };

    match verifier.verify(&request.spec.token) {
        Ok(identity) => {
            info!(uid = %identity.uid, username = %identity.username, "token authenticated");
            TokenReview::authenticated(identity)
        }
        Err(e) => {
            info!(error = %e, "token rejected");
            TokenReview::unauthenticated(REJECTED)
        }
    }
}
