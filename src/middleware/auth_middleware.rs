use axum::{
    headers::{authorization::Bearer, Authorization},
    http::Request,
    middleware::Next,
    response::Response,
    Extension, TypedHeader,
};
use tracing::{debug, warn};

use crate::{
    app_state::AppState, errors::ChatError, models::user::ChatUser,
    services::jwt_service::validate_token,
};

/// The authenticated caller, inserted into request extensions.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub ChatUser);

/// Resolves a bearer token to a known user.
pub async fn authenticate(state: &AppState, token: &str) -> Result<ChatUser, ChatError> {
    let user_id = validate_token(token, &state.jwt_secret).ok_or_else(|| {
        warn!("Rejected invalid or expired token");
        ChatError::Unauthorized
    })?;

    state.chat.find_user(user_id).await?.ok_or_else(|| {
        warn!("Token for unknown user {}", user_id);
        ChatError::Unauthorized
    })
}

pub async fn auth_middleware<B>(
    Extension(state): Extension<AppState>,
    authorization: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<B>,
    next: Next<B>,
) -> Result<Response, ChatError> {
    let TypedHeader(Authorization(bearer)) = authorization.ok_or(ChatError::Unauthorized)?;

    let user = authenticate(&state, bearer.token()).await?;
    debug!("Authenticated user {}", user.id);

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}
