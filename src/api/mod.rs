//! Clients for the site's external collaborators.
//!
//! Both hosts are on the worker's bypass list, so these requests are never
//! intercepted or cached:
//!
//! - `GithubClient`: read-only repository listing for the project cards
//! - `ContactClient`: form-encoded delivery of contact messages

pub mod contact;
pub mod error;
pub mod github;

pub use contact::{ContactClient, ContactMessage};
pub use error::ApiError;
pub use github::GithubClient;
