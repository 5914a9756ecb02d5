//! Menu extraction: vision/LLM primary path with OCR fallback.
//!
//! The primary path asks a vision model for structured dish candidates and
//! parses its reply defensively; anything short of parseable output routes
//! to the OCR fallback instead of surfacing a parse error. The fallback is
//! names-only and considerably lower precision — callers tolerate noise.
//!
//! The one user-actionable error is an unsupported image encoding, detected
//! from magic bytes before any collaborator is consulted.

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use tracing::{debug, warn};

use menulens_core::{
    defaults, detect_image_mime, Error, EventBus, ExtractedDish, MenuExtraction,
    MenuVisionBackend, OcrBackend, Result, ServerEvent,
};
use menulens_quota::Decision;

/// Vision-primary, OCR-fallback menu extractor.
pub struct VisionExtractor {
    vision: Option<Arc<dyn MenuVisionBackend>>,
    ocr: Option<Arc<dyn OcrBackend>>,
    limiter: Arc<menulens_quota::RateLimiter>,
    events: Arc<EventBus>,
}

impl VisionExtractor {
    pub fn new(
        vision: Option<Arc<dyn MenuVisionBackend>>,
        ocr: Option<Arc<dyn OcrBackend>>,
        limiter: Arc<menulens_quota::RateLimiter>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            vision,
            ocr,
            limiter,
            events,
        }
    }

    /// Extract dish candidates from a photographed menu.
    ///
    /// `is_menu = false` is a successful result. Errors are limited to
    /// unsupported encodings (user-actionable) and total configuration
    /// absence of both paths.
    pub async fn extract(&self, image_data: &[u8]) -> Result<MenuExtraction> {
        let mime_type = detect_image_mime(image_data)?;

        if let Some(extraction) = self.try_primary(image_data, mime_type).await {
            return Ok(extraction);
        }
        if let Some(extraction) = self.try_fallback(image_data, mime_type).await {
            return Ok(extraction);
        }

        Err(Error::Config(
            "no menu extraction backend configured".to_string(),
        ))
    }

    /// Vision/LLM path. None routes to the fallback.
    async fn try_primary(&self, image_data: &[u8], mime_type: &str) -> Option<MenuExtraction> {
        let vision = self.vision.as_ref()?;

        match self.limiter.check_and_increment(defaults::API_VISION).await {
            Decision::Allowed => {}
            Decision::Denied(_) => {
                warn!(
                    subsystem = "engine",
                    component = "extractor",
                    "Vision quota denied, falling back to OCR"
                );
                return None;
            }
        }

        let start = Instant::now();
        let result = vision.extract_menu(image_data, mime_type).await;
        self.events.emit(ServerEvent::ApiCall {
            api: defaults::API_VISION.to_string(),
            duration_ms: Some(start.elapsed().as_millis() as u64),
            success: result.is_ok(),
        });

        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Vision extraction failed, falling back to OCR");
                return None;
            }
        };

        match parse_vision_reply(&raw) {
            Some(extraction) => {
                debug!(
                    subsystem = "engine",
                    component = "extractor",
                    op = "extract",
                    dish_count = extraction.dishes.len(),
                    is_menu = extraction.is_menu,
                    "Vision extraction parsed"
                );
                Some(extraction)
            }
            None => {
                warn!(
                    response_len = raw.len(),
                    "Unparseable vision reply, falling back to OCR"
                );
                None
            }
        }
    }

    /// OCR path: raw lines filtered to dish-name-shaped candidates.
    async fn try_fallback(&self, image_data: &[u8], mime_type: &str) -> Option<MenuExtraction> {
        let ocr = self.ocr.as_ref()?;

        match self.limiter.check_and_increment(defaults::API_OCR).await {
            Decision::Allowed => {}
            Decision::Denied(_) => {
                warn!(
                    subsystem = "engine",
                    component = "extractor",
                    "OCR quota denied"
                );
                return None;
            }
        }

        let start = Instant::now();
        let result = ocr.detect_text(image_data, mime_type).await;
        self.events.emit(ServerEvent::ApiCall {
            api: defaults::API_OCR.to_string(),
            duration_ms: Some(start.elapsed().as_millis() as u64),
            success: result.is_ok(),
        });

        let text = match result {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "OCR fallback failed");
                return None;
            }
        };

        let dishes: Vec<ExtractedDish> = filter_ocr_lines(&text)
            .into_iter()
            .map(|name| ExtractedDish {
                name,
                menu_description: None,
            })
            .collect();

        debug!(
            subsystem = "engine",
            component = "extractor",
            op = "extract_fallback",
            dish_count = dishes.len(),
            "OCR fallback extraction complete"
        );

        // With no vision judgment available, "no dish-shaped lines" is the
        // closest signal for "not a menu".
        let is_menu = !dishes.is_empty();
        Some(MenuExtraction { dishes, is_menu })
    }
}

#[derive(Deserialize)]
struct VisionReplyDish {
    name: String,
    #[serde(default, alias = "description")]
    menu_description: Option<String>,
}

#[derive(Deserialize)]
struct VisionReply {
    #[serde(alias = "isMenu")]
    is_menu: bool,
    #[serde(default)]
    dishes: Vec<VisionReplyDish>,
}

/// Parse the vision model's structured reply defensively.
///
/// Tolerates code fences and leading/trailing prose around the JSON object.
/// Returns None on anything unparseable so the caller can fall back.
fn parse_vision_reply(raw: &str) -> Option<MenuExtraction> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }

    let reply: VisionReply = serde_json::from_str(&raw[start..=end]).ok()?;

    let dishes: Vec<ExtractedDish> = reply
        .dishes
        .into_iter()
        .filter_map(|d| {
            let name = d.name.trim().to_string();
            if name.is_empty() || name.len() > 80 {
                return None;
            }
            Some(ExtractedDish {
                name,
                menu_description: d
                    .menu_description
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty()),
            })
        })
        .collect();

    Some(MenuExtraction {
        dishes,
        is_menu: reply.is_menu,
    })
}

/// Keep OCR lines that look like dish names: 2–10 words and at most 50
/// characters.
fn filter_ocr_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| {
            let words = line.split_whitespace().count();
            (defaults::OCR_LINE_MIN_WORDS..=defaults::OCR_LINE_MAX_WORDS).contains(&words)
                && line.len() <= defaults::OCR_LINE_MAX_CHARS
        })
        .map(str::to_string)
        .collect()
}
