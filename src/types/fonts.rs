use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A catalog entry enriched with rank and suitability flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontFamily {
    pub family: String,
    pub category: String,
    #[serde(default)]
    pub variants: Vec<String>,
    #[serde(default)]
    pub subsets: Vec<String>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub last_modified: String,
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    pub popularity_rank: usize,
    pub suitable_for_ui: bool,
    pub suitable_for_headings: bool,
    pub suitable_for_body: bool,
    #[serde(default)]
    pub fallback: bool,
}

/// Editor-relevant traits of a coding font.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodingFeatures {
    pub ligatures_support: bool,
    pub zero_distinction: bool,
    /// Out of 10.
    pub readability_score: u8,
    pub best_sizes: Vec<u32>,
    pub recommended_line_height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodingFont {
    #[serde(flatten)]
    pub font: FontFamily,
    pub features: CodingFeatures,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontDetails {
    pub family: String,
    pub category: String,
    pub variants: Vec<String>,
    pub subsets: Vec<String>,
    pub version: String,
    pub last_modified: String,
    /// 1-based position in the catalog; `None` for unknown families.
    pub popularity: Option<usize>,
    pub download_urls: Vec<String>,
    pub css_url: String,
    pub preview_text: String,
    pub characteristics: Vec<String>,
    pub usage_recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContrastLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontPairing {
    pub secondary_font: String,
    pub category: String,
    pub contrast_level: ContrastLevel,
    /// 0..=100.
    pub harmony_score: u8,
    pub use_case: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemFont {
    pub family: &'static str,
    pub category: &'static str,
    pub platforms: &'static [&'static str],
    pub suitable_for_coding: bool,
}
