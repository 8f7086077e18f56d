//! Model, aspect-ratio and artistic-style catalog.
//!
//! Models are routed through OpenRouter; the `id` is the provider model
//! slug and `name` is what appears on image records (`model_name`).

use serde::Serialize;

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub provider: &'static str,
}

pub const AVAILABLE_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "openai/gpt-5-image",
        name: "GPT-5 Image",
        provider: "OpenAI",
    },
    ModelInfo {
        id: "openai/gpt-5-image-mini",
        name: "GPT-5 Image Mini",
        provider: "OpenAI",
    },
    ModelInfo {
        id: "google/gemini-3-pro-image-preview",
        name: "Gemini 3 Pro Image",
        provider: "Google",
    },
    ModelInfo {
        id: "google/gemini-2.5-flash-image",
        name: "Nano Banana",
        provider: "Google",
    },
    ModelInfo {
        id: "bytedance-seed/seedream-4.5",
        name: "Seedream 4.5",
        provider: "ByteDance Seed",
    },
    ModelInfo {
        id: "black-forest-labs/flux.2-max",
        name: "FLUX.2 Max",
        provider: "Black Forest Labs",
    },
];

pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
    AVAILABLE_MODELS.iter().find(|m| m.id == id)
}

/// Display name for a model id, falling back to the id itself.
pub fn model_display_name(id: &str) -> String {
    find_model(id)
        .map(|m| m.name.to_string())
        .unwrap_or_else(|| id.to_string())
}

/// Display names for the selected ids, in catalog order.
///
/// Ids missing from the catalog are appended afterwards using the raw id, so
/// every selected model still gets a placeholder. Repeated ids yield one name.
pub fn model_names_for(ids: &[String]) -> Vec<String> {
    let mut names: Vec<String> = AVAILABLE_MODELS
        .iter()
        .filter(|m| ids.iter().any(|id| id == m.id))
        .map(|m| m.name.to_string())
        .collect();
    for id in ids {
        if find_model(id).is_none() && !names.contains(id) {
            names.push(id.clone());
        }
    }
    names
}

// ---------------------------------------------------------------------------
// Aspect ratios
// ---------------------------------------------------------------------------

pub const DEFAULT_ASPECT_RATIO: &str = "1:1";

pub const ASPECT_RATIOS: &[&str] = &["1:1", "16:9", "9:16", "4:3", "3:4", "21:9"];

pub fn is_known_aspect_ratio(ratio: &str) -> bool {
    ASPECT_RATIOS.contains(&ratio)
}

// ---------------------------------------------------------------------------
// Artistic styles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArtisticStyle {
    pub id: &'static str,
    pub name: &'static str,
    pub keywords: &'static str,
}

pub const ARTISTIC_STYLES: &[ArtisticStyle] = &[
    ArtisticStyle {
        id: "photorealistic",
        name: "Photorealistic",
        keywords: "photorealistic, ultra-realistic, highly detailed, 8k resolution, professional photography, sharp focus, perfect lighting, cinematic quality",
    },
    ArtisticStyle {
        id: "anime",
        name: "Anime",
        keywords: "anime style, Japanese animation, vibrant colors, cel-shaded, detailed character design, expressive eyes, manga-inspired",
    },
    ArtisticStyle {
        id: "oil-painting",
        name: "Oil Painting",
        keywords: "oil painting, classical art, rich textures, visible brush strokes, impasto technique, traditional fine art",
    },
    ArtisticStyle {
        id: "watercolor",
        name: "Watercolor",
        keywords: "watercolor painting, soft flowing colors, translucent washes, delicate gradients, paper texture visible",
    },
    ArtisticStyle {
        id: "digital-art",
        name: "Digital Art",
        keywords: "digital art, concept art, highly detailed, vibrant colors, professional digital illustration, crisp lines",
    },
    ArtisticStyle {
        id: "sketch",
        name: "Sketch",
        keywords: "pencil sketch, detailed line art, black and white, hand-drawn, cross-hatching, graphite drawing",
    },
    ArtisticStyle {
        id: "3d-render",
        name: "3D Render",
        keywords: "3D render, CGI, octane render, photorealistic 3D, volumetric lighting, ray-traced shadows",
    },
    ArtisticStyle {
        id: "cyberpunk",
        name: "Cyberpunk",
        keywords: "cyberpunk style, neon lights, futuristic cityscape, dark atmosphere, rain-soaked streets, holographic displays",
    },
    ArtisticStyle {
        id: "impressionist",
        name: "Impressionist",
        keywords: "impressionist painting, soft brush strokes, plein air style, dappled sunlight, French impressionism",
    },
    ArtisticStyle {
        id: "minimalist",
        name: "Minimalist",
        keywords: "minimalist art, clean composition, negative space, geometric shapes, refined simplicity",
    },
];

pub fn find_style(id: &str) -> Option<&'static ArtisticStyle> {
    ARTISTIC_STYLES.iter().find(|s| s.id == id)
}

/// Append the keywords of the selected styles to the trimmed prompt.
///
/// Unknown style ids are ignored. With no known styles the trimmed prompt is
/// returned unchanged.
pub fn enhance_prompt(prompt: &str, style_ids: &[String]) -> String {
    let base = prompt.trim();
    let keywords: Vec<&str> = style_ids
        .iter()
        .filter_map(|id| find_style(id))
        .map(|s| s.keywords)
        .collect();

    if keywords.is_empty() {
        base.to_string()
    } else {
        format!("{base}, {}", keywords.join(", "))
    }
}
