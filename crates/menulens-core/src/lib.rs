//! # menulens-core
//!
//! Core types, traits, and abstractions for the menulens backend.
//!
//! This crate provides the foundational data structures and trait definitions
//! that other menulens crates depend on: the error taxonomy, domain models,
//! dish-name normalization, the event bus, and the collaborator contracts.

pub mod defaults;
pub mod error;
pub mod events;
pub mod image_safety;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{EventBus, ServerEvent};
pub use image_safety::{detect_image_mime, is_supported_image, SUPPORTED_IMAGE_MIMES};
pub use models::*;
pub use normalize::normalize_dish_name;
pub use traits::*;
