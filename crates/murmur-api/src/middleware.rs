use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use murmur_types::api::Claims;

use crate::error::FeedError;
use crate::state::AppState;

/// Who is making the request, as vouched for by the identity provider's token.
/// The core never authenticates on its own; it only reads this.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer {
    external_id: Option<String>,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self { external_id: None }
    }

    pub fn external(external_id: impl Into<String>) -> Self {
        Self {
            external_id: Some(external_id.into()),
        }
    }

    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }
}

/// Attach a [`Viewer`] to every request. No Authorization header means an
/// anonymous viewer; a header carrying a bad token is rejected outright.
pub async fn resolve_viewer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, FeedError> {
    let viewer = match req.headers().get(header::AUTHORIZATION) {
        None => Viewer::anonymous(),
        Some(value) => {
            let token = value
                .to_str()
                .ok()
                .and_then(|v| v.strip_prefix("Bearer "))
                .ok_or(FeedError::Unauthenticated)?;

            let token_data = decode::<Claims>(
                token,
                &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
                &Validation::default(),
            )
            .map_err(|_| FeedError::Unauthenticated)?;

            Viewer::external(token_data.claims.sub)
        }
    };

    req.extensions_mut().insert(viewer);
    Ok(next.run(req).await)
}
