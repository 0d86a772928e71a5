mod artifact;
mod bot;
mod chat;
mod message;
mod model;
mod task;

pub use artifact::*;
pub use bot::*;
pub use chat::*;
pub use message::*;
pub use model::*;
pub use task::*;
