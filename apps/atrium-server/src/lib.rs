#![forbid(unsafe_code)]

mod server;

pub use server::{
    build_router, init_tracing, issue_access_token, AppConfig, DirectoryUser,
    ACCESS_TOKEN_TTL_SECS, DEFAULT_CHAT_INGRESS_MESSAGES_PER_WINDOW,
    DEFAULT_CHAT_INGRESS_WINDOW_SECS, DEFAULT_CHAT_OUTBOUND_QUEUE, DEFAULT_HISTORY_LIMIT_MAX,
    DEFAULT_JSON_BODY_LIMIT_BYTES, DEFAULT_MAX_CHAT_FRAME_BYTES,
    DEFAULT_RATE_LIMIT_REQUESTS_PER_MINUTE, DEFAULT_REQUEST_TIMEOUT_SECS,
};
