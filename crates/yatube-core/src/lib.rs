//! # Yatube Core
//!
//! The domain layer of the Yatube blogging platform.
//! Entities, ports, pagination and input schemas; no infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod forms;
pub mod pagination;
pub mod ports;

pub use error::{DomainError, RepoError};
pub use pagination::{POSTS_PER_PAGE, Page, PageWindow, Paginator};
