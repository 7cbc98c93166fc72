use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::config::config_model::BasicAuth;

const REALM: &str = "Basic realm=\"Authorization Required\"";

/// Route layer guarding the `/api` group with a single static account.
pub async fn require_basic_auth(
    State(account): State<Arc<BasicAuth>>,
    authorization: Option<TypedHeader<Authorization<Basic>>>,
    request: Request,
    next: Next,
) -> Response {
    match authorization {
        Some(TypedHeader(Authorization(basic))) if account.accepts(&basic) => {
            next.run(request).await
        }
        Some(TypedHeader(Authorization(basic))) => {
            warn!(
                username = %basic.username(),
                path = %request.uri().path(),
                "auth: rejected basic credentials"
            );
            unauthorized()
        }
        None => {
            debug!(path = %request.uri().path(), "auth: missing basic credentials");
            unauthorized()
        }
    }
}

impl BasicAuth {
    fn accepts(&self, basic: &Basic) -> bool {
        let username = basic.username().as_bytes().ct_eq(self.username.as_bytes());
        let password = basic.password().as_bytes().ct_eq(self.password.as_bytes());
        (username & password).into()
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(WWW_AUTHENTICATE, HeaderValue::from_static(REALM))],
    )
        .into_response()
}
