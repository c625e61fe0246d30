pub mod message_service;

pub use message_service::{MessageService, SentMessage, MIN_SEARCH_QUERY_LEN};
