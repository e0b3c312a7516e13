pub mod auth_middleware;
pub mod ws_auth_middleware;
