// Names shown on the selection screen and the values the rest of the crate keys on.

/// Celebrities offered on the selection screen, in display order.
pub const CELEBRITIES: &[&str] = &[
    "Leonardo DiCaprio",
    "Scarlett Johansson",
    "Tom Hanks",
    "Emma Watson",
    "Dwayne Johnson",
    "Taylor Swift",
    "Chris Hemsworth",
    "Ariana Grande",
];

/// Selection value that switches the selection screen to free-text entry.
pub const CUSTOM_SENTINEL: &str = "custom";

/// Label for the custom entry in selection lists.
pub const CUSTOM_LABEL: &str = "Custom Celebrity";

/// Environment variable supplying the backend base URL.
pub const API_BASE_URL_ENV: &str = "CELEBCHAT_API_BASE_URL";

/// Path of the chat endpoint, relative to the base URL.
pub const CHAT_PATH: &str = "/chat";

pub const DEFAULT_PORT: u16 = 9900;

/// Speaker label for the user's own messages.
pub const USER_LABEL: &str = "You";
