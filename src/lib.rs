pub mod chat;
pub mod client;
pub mod config;
pub mod constants;
pub mod session;
pub mod store;
pub mod web_server;

pub use client::{ChatBackend, ChatError, ChatRequest, HttpChatClient};
pub use config::Config;
pub use session::{ChatMessage, ChatState, Phase, Role, Selection};
pub use store::{SendOutcome, Store};
