//! Provider pricing tables and cost math.
//!
//! Immutable reference data: USD rates per million tokens for text
//! models and fixed per-image rates by (model, size). Costs are rounded
//! to six decimals, matching the precision the ledger stores.

// ---------------------------------------------------------------------------
// Text pricing
// ---------------------------------------------------------------------------

/// USD per one million tokens for a text model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

/// Rates for models we don't recognize. Conservative (highest current
/// tier) so an unknown model over-counts rather than under-counts spend
/// against the budget gate.
const FALLBACK_TEXT_PRICING: ModelPricing = ModelPricing {
    input_per_million: 30.0,
    output_per_million: 60.0,
};

/// Text pricing keyed by model-name prefix. First match wins, so longer
/// prefixes precede shorter ones within a family.
pub const TEXT_PRICING: &[(&str, ModelPricing)] = &[
    ("gpt-4o-mini", ModelPricing { input_per_million: 0.15, output_per_million: 0.60 }),
    ("gpt-4o", ModelPricing { input_per_million: 2.50, output_per_million: 10.00 }),
    ("gpt-4-turbo", ModelPricing { input_per_million: 10.00, output_per_million: 30.00 }),
    ("gpt-4", ModelPricing { input_per_million: 30.00, output_per_million: 60.00 }),
    ("gpt-3.5-turbo", ModelPricing { input_per_million: 0.50, output_per_million: 1.50 }),
    ("gpt-5-mini", ModelPricing { input_per_million: 0.25, output_per_million: 2.00 }),
    ("gpt-5", ModelPricing { input_per_million: 1.25, output_per_million: 10.00 }),
    ("o1-mini", ModelPricing { input_per_million: 1.10, output_per_million: 4.40 }),
    ("o1", ModelPricing { input_per_million: 15.00, output_per_million: 60.00 }),
    ("o3-mini", ModelPricing { input_per_million: 1.10, output_per_million: 4.40 }),
    ("o3", ModelPricing { input_per_million: 2.00, output_per_million: 8.00 }),
    ("o4-mini", ModelPricing { input_per_million: 1.10, output_per_million: 4.40 }),
];

/// Look up the pricing for a text model by prefix match.
pub fn text_pricing(model: &str) -> ModelPricing {
    for (prefix, pricing) in TEXT_PRICING {
        if model.starts_with(prefix) {
            return *pricing;
        }
    }
    FALLBACK_TEXT_PRICING
}

/// USD cost of one text completion, rounded to six decimals.
pub fn text_cost(model: &str, prompt_tokens: u32, completion_tokens: u32) -> f64 {
    let pricing = text_pricing(model);
    let raw = prompt_tokens as f64 / 1_000_000.0 * pricing.input_per_million
        + completion_tokens as f64 / 1_000_000.0 * pricing.output_per_million;
    round6(raw)
}

// ---------------------------------------------------------------------------
// Image pricing
// ---------------------------------------------------------------------------

/// Requested image quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageQuality {
    Standard,
    Hd,
}

impl ImageQuality {
    /// Wire value for the image endpoint.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Hd => "hd",
        }
    }
}

/// Multiplier applied to the base rate for the HD tier on models that
/// support it.
pub const HD_QUALITY_MULTIPLIER: f64 = 2.0;

/// Fixed per-image rates by (model prefix, size). Sizes the provider
/// does not offer for a model are simply absent.
pub const IMAGE_PRICING: &[(&str, &str, f64)] = &[
    ("dall-e-3", "1024x1024", 0.040),
    ("dall-e-3", "1024x1792", 0.080),
    ("dall-e-3", "1792x1024", 0.080),
    ("dall-e-2", "1024x1024", 0.020),
    ("dall-e-2", "512x512", 0.018),
    ("dall-e-2", "256x256", 0.016),
];

/// Base rate for unknown (model, size) combinations.
const FALLBACK_IMAGE_RATE: f64 = 0.040;

/// USD cost of one generated image. The HD tier doubles the base rate
/// on models that support it and is ignored on models that don't.
pub fn image_cost(model: &str, size: &str, quality: ImageQuality, supports_hd: bool) -> f64 {
    let base = IMAGE_PRICING
        .iter()
        .find(|(m, s, _)| model.starts_with(m) && *s == size)
        .map(|(_, _, rate)| *rate)
        .unwrap_or(FALLBACK_IMAGE_RATE);

    let rate = if quality == ImageQuality::Hd && supports_hd {
        base * HD_QUALITY_MULTIPLIER
    } else {
        base
    };
    round6(rate)
}

// ---------------------------------------------------------------------------
// Rounding
// ---------------------------------------------------------------------------

/// Round to six decimal places (micro-dollar precision).
pub fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
