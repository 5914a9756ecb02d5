//! # menulens-engine
//!
//! Menu analysis engine for menulens.
//!
//! This crate composes the collaborator contracts from `menulens-core` and
//! the quota gate from `menulens-quota` into the product's core flows:
//! - Vision extraction with OCR fallback ([`extractor::VisionExtractor`])
//! - Cache-first image resolution ([`resolver::ImageResolver`])
//! - Two-tier cached description generation ([`describer::DescriptionGenerator`])
//! - Validated preference-based recommendations ([`recommender::RecommendationEngine`])
//! - The per-photo analysis pipeline ([`pipeline::MenuAnalyzer`])
//!
//! Collaborator handles are injected at construction; nothing in this crate
//! reaches for global state.

pub mod describer;
pub mod extractor;
pub mod pipeline;
pub mod recommender;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;

// Re-export core types
pub use menulens_core::*;

pub use describer::DescriptionGenerator;
pub use extractor::VisionExtractor;
pub use pipeline::MenuAnalyzer;
pub use recommender::RecommendationEngine;
pub use resolver::{ImageResolver, ResolvedImages};
