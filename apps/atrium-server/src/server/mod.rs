pub(crate) mod auth;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod directory;
pub(crate) mod errors;
pub(crate) mod handlers;
pub(crate) mod message_store;
pub(crate) mod metrics;
pub(crate) mod realtime;
pub(crate) mod router;
pub(crate) mod types;

pub use auth::issue_access_token;
pub use self::core::{
    AppConfig, ACCESS_TOKEN_TTL_SECS, DEFAULT_CHAT_INGRESS_MESSAGES_PER_WINDOW,
    DEFAULT_CHAT_INGRESS_WINDOW_SECS, DEFAULT_CHAT_OUTBOUND_QUEUE, DEFAULT_HISTORY_LIMIT_MAX,
    DEFAULT_JSON_BODY_LIMIT_BYTES, DEFAULT_MAX_CHAT_FRAME_BYTES,
    DEFAULT_RATE_LIMIT_REQUESTS_PER_MINUTE, DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use directory::DirectoryUser;
pub use errors::init_tracing;
pub use router::build_router;
