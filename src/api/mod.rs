pub mod client;
pub mod session;
pub mod sync;

pub use client::PlatformClient;
pub use session::SessionState;
