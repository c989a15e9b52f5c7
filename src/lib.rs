pub mod core;
pub mod filter;

// Re-export core types
pub use crate::core::{TagSpec, FilterOptions, ChatStreamItem, FilterError, DEFAULT_OPEN_TAG, DEFAULT_CLOSE_TAG};

// Main interface
pub use crate::filter::{BatchFilter, StreamingTagFilter, FilterChunks, strip_tags, filter_stream, filter_chat_stream, filter_chunks};
