//! # Yatube Shared
//!
//! Serializable payloads exchanged with clients: the data each page needs,
//! and RFC 7807 error bodies.

pub mod dto;
pub mod response;

pub use dto::PageBody;
pub use response::ErrorResponse;
