pub mod chat_handlers;
