//! Core types shared by every stage of the render pipeline.
//!
//! - [`Document`] - one decoded manifest record
//! - [`RenderError`] - strongly-typed failures for every stage
//! - [`ErrorContext`] / [`user_friendly_error`] - CLI-facing error display

pub mod document;
pub mod error;

pub use document::Document;
pub use error::{ErrorContext, RenderError, Result, user_friendly_error};
