pub mod artifacts;
pub mod bots;
pub mod chats;
pub mod messages;
pub mod models;
pub mod settings;
pub mod tasks;
