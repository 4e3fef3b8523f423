use {
    crate::{
        adapters::api_errors::ApiError,
        domain::{error::HistoryError, permission::Role},
    },
    axum::{extract::FromRequestParts, http::request::Parts},
};

pub const ACTOR_HEADER: &str = "x-actor";
pub const ROLE_HEADER: &str = "x-role";

/// Authenticated caller as forwarded by the upstream auth layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub actor: String,
    pub role: Role,
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let actor = header(ACTOR_HEADER)
            .ok_or_else(|| HistoryError::Forbidden("missing caller identity".into()))?;
        let role = header(ROLE_HEADER)
            .ok_or_else(|| HistoryError::Forbidden("missing caller role".into()))?;

        Ok(Self {
            actor: actor.to_string(),
            role: Role::try_from(role)?,
        })
    }
}
