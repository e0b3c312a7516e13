use axum::{
    extract::Query,
    headers::{authorization::Bearer, Authorization},
    http::Request,
    middleware::Next,
    response::Response,
    Extension, TypedHeader,
};
use serde::Deserialize;
use tracing::{debug, error};

use super::auth_middleware::{authenticate, CurrentUser};
use crate::{app_state::AppState, errors::ChatError};

#[derive(Deserialize, Debug)]
pub struct WebSocketParams {
    pub token: Option<String>, // Browsers cannot set headers on a WebSocket handshake
}

/// Authenticates a socket handshake from the `token` query parameter or the
/// `Authorization` header, before the connection is upgraded.
pub async fn ws_auth_middleware<B>(
    Query(params): Query<WebSocketParams>,
    authorization: Option<TypedHeader<Authorization<Bearer>>>,
    Extension(state): Extension<AppState>,
    mut request: Request<B>,
    next: Next<B>,
) -> Result<Response, ChatError> {
    let token = if let Some(token) = params.token {
        debug!("Using token from query params");
        token
    } else if let Some(TypedHeader(Authorization(bearer))) = authorization {
        debug!("Using token from Authorization header");
        bearer.token().to_string()
    } else {
        error!("No token found in query params or Authorization header");
        return Err(ChatError::Unauthorized);
    };

    let user = authenticate(&state, &token).await?;
    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}
