pub mod auth;
pub mod chat;
pub mod files;
pub mod history;
pub mod upload;
