//! Generator for personalized children's picture books
//!
//! Turns a child's name, age, interests and theme into a five-page story via a
//! text model, then illustrates every page with an image model and persists
//! the result after each stage.

pub mod ai;
pub mod client;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod server;
pub mod store;
pub mod story;

pub use error::{Error, Result};
