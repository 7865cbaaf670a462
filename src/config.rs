use clap::Args;

use crate::constants::{API_BASE_URL_ENV, CHAT_PATH};

/// Settings shared by every front end, built once at startup and passed down.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the chat backend; requests go to `<URL>/chat`.
    #[arg(long, global = true, env = API_BASE_URL_ENV)]
    pub api_base_url: Option<String>,
}

impl Config {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: Some(api_base_url.into()),
        }
    }

    /// Full URL of the chat endpoint, or `None` when no base URL was configured.
    ///
    /// The base URL is not validated here; a malformed value only shows up as a
    /// failed request.
    pub fn chat_url(&self) -> Option<String> {
        self.api_base_url
            .as_deref()
            .map(|base| format!("{}{}", base.trim_end_matches('/'), CHAT_PATH))
    }
}
