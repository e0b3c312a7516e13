use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::models::user::Claims;

// Issues a token for the user, valid for one day. The host application issues
// tokens in production; this is used by tests and local tooling.
pub fn create_jwt(user_id: Uuid, secret_key: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(1)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret_key.as_bytes()),
    )
}

// Validates the provided JWT token and returns the user ID if valid.
pub fn validate_token(token: &str, secret_key: &str) -> Option<Uuid> {
    let validation = Validation::new(Algorithm::HS256);

    match decode::<Claims>(
        token.trim(),
        &DecodingKey::from_secret(secret_key.as_bytes()),
        &validation,
    ) {
        Ok(data) => Uuid::parse_str(&data.claims.sub).ok(),
        Err(_) => None,
    }
}
