pub mod chat_repository;
pub mod chat_store;
pub mod memory_store;
