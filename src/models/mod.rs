//! Data models for the project listing.
//!
//! - `Repo`: the GitHub repos endpoint wire shape
//! - `Project`, `Category`: display-ready card data with language
//!   color/icon lookups

pub mod repo;

pub use repo::{categorize, language_color, language_icon, Category, Project, Repo};
