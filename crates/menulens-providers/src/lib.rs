//! # menulens-providers
//!
//! HTTP collaborator clients for menulens.
//!
//! This crate implements the collaborator contracts from `menulens-core`
//! against concrete HTTP services:
//! - Vision/LLM menu extraction (Ollama-compatible chat API)
//! - Fallback OCR text detection (generic REST service)
//! - Web image search (CSE-style GET API)
//! - Text generation (Ollama-compatible chat API)
//!
//! Every call carries a seconds-scale timeout; timeouts are reported as
//! provider errors and routed through the callers' degrade/fallback paths.

pub mod generation;
pub mod image_search;
pub mod ocr;
pub mod vision;

// Re-export core types
pub use menulens_core::*;

pub use generation::OllamaGeneration;
pub use image_search::{CseImageSearch, DEFAULT_SEARCH_URL};
pub use ocr::HttpOcrClient;
pub use vision::OllamaMenuVision;
