pub mod chat_service;
pub mod jwt_service;
