pub mod chat;
pub mod login;
pub mod migrate;
