use crate::api::fonts_api::{FontsEndpoints, WebFontItem};
use crate::api::{default_retry_policy, with_retry};
use crate::config::Config;
use crate::types::fonts::{
    CodingFeatures, CodingFont, ContrastLevel, FontDetails, FontFamily, FontPairing, SystemFont,
};
use backon::ExponentialBuilder;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use url::Url;

pub const CACHE_FILE: &str = "font_families.json";
pub const CACHE_TTL_DAYS: i64 = 7;
pub const DEFAULT_SORT: &str = "popularity";
const PAIRING_SCAN: usize = 50;
const PAIRING_LIMIT: usize = 10;
const GOOGLE_FONTS_CSS: &str = "https://fonts.googleapis.com/css2";

const KNOWN_CODING_FONTS: [&str; 9] = [
    "Fira Code",
    "Source Code Pro",
    "JetBrains Mono",
    "Roboto Mono",
    "Ubuntu Mono",
    "Inconsolata",
    "PT Mono",
    "Space Mono",
    "IBM Plex Mono",
];

static SYSTEM_FONTS: [SystemFont; 7] = [
    SystemFont {
        family: "Arial",
        category: "sans-serif",
        platforms: &["Windows", "macOS", "Linux"],
        suitable_for_coding: false,
    },
    SystemFont {
        family: "Times New Roman",
        category: "serif",
        platforms: &["Windows", "macOS"],
        suitable_for_coding: false,
    },
    SystemFont {
        family: "Courier New",
        category: "monospace",
        platforms: &["Windows", "macOS", "Linux"],
        suitable_for_coding: true,
    },
    SystemFont {
        family: "Helvetica",
        category: "sans-serif",
        platforms: &["macOS", "Linux"],
        suitable_for_coding: false,
    },
    SystemFont {
        family: "Monaco",
        category: "monospace",
        platforms: &["macOS"],
        suitable_for_coding: true,
    },
    SystemFont {
        family: "Consolas",
        category: "monospace",
        platforms: &["Windows"],
        suitable_for_coding: true,
    },
    SystemFont {
        family: "DejaVu Sans Mono",
        category: "monospace",
        platforms: &["Linux"],
        suitable_for_coding: true,
    },
];

/// On-disk catalog snapshot.
#[derive(Debug, Serialize, Deserialize)]
struct CatalogCache {
    cached_at: DateTime<Utc>,
    sort: String,
    families: Vec<FontFamily>,
}

/// Google Fonts catalog browsing with a 7-day disk cache. Lookups never
/// fail; an unreachable catalog degrades to a small list of system fonts.
pub struct FontsService {
    client: reqwest::Client,
    base: Url,
    api_key: Option<String>,
    cache_dir: PathBuf,
    retry_policy: ExponentialBuilder,
}

impl FontsService {
    pub fn new(
        client: reqwest::Client,
        cfg: &Config,
        api_key: Option<String>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            base: cfg.api_endpoints.fonts.clone(),
            api_key,
            cache_dir: cache_dir.into(),
            retry_policy: default_retry_policy(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: ExponentialBuilder) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn cache_file(&self) -> PathBuf {
        self.cache_dir.join(CACHE_FILE)
    }

    pub async fn families(&self, sort: &str) -> Vec<FontFamily> {
        if let Some(cached) = load_cache(&self.cache_file(), sort).await {
            debug!(count = cached.len(), "using cached font catalog");
            return cached;
        }
        let Some(key) = self.api_key.as_deref() else {
            return fallback_fonts();
        };

        let fetched = with_retry("fonts", self.retry_policy, || async {
            FontsEndpoints::webfonts(&self.client, &self.base, key, sort).await
        })
        .await;
        match fetched {
            Ok(items) => {
                let families = process_families(items);
                self.save_cache(sort, &families).await;
                families
            }
            Err(e) => {
                warn!(error = %e, "font catalog request failed; using system fonts");
                fallback_fonts()
            }
        }
    }

    pub async fn coding_fonts(&self) -> Vec<CodingFont> {
        self.families(DEFAULT_SORT)
            .await
            .into_iter()
            .filter(is_coding_font)
            .map(|font| {
                let features = coding_features(&font.family);
                CodingFont { font, features }
            })
            .collect()
    }

    pub async fn details(&self, family: &str) -> FontDetails {
        let families = self.families(DEFAULT_SORT).await;
        details_from_catalog(&families, family)
    }

    pub async fn pairings(&self, primary: &str) -> Vec<FontPairing> {
        let families = self.families(DEFAULT_SORT).await;
        pairings_from_catalog(&families, primary)
    }

    pub async fn preview_css(&self, family: &str, size: u32) -> String {
        let details = self.details(family).await;
        preview_css(family, &details.category, size)
    }

    pub fn system_fonts(&self) -> &'static [SystemFont] {
        &SYSTEM_FONTS
    }

    async fn save_cache(&self, sort: &str, families: &[FontFamily]) {
        let snapshot = CatalogCache {
            cached_at: Utc::now(),
            sort: sort.to_string(),
            families: families.to_vec(),
        };
        let path = self.cache_file();
        let written = async {
            tokio::fs::create_dir_all(&self.cache_dir).await?;
            let raw = serde_json::to_vec_pretty(&snapshot)?;
            tokio::fs::write(&path, raw).await?;
            Ok::<_, crate::error::CodeMasterError>(())
        }
        .await;
        match written {
            Ok(()) => info!(path = %path.display(), count = families.len(), "font catalog cached"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to cache font catalog"),
        }
    }
}

async fn load_cache(path: &Path, sort: &str) -> Option<Vec<FontFamily>> {
    let raw = tokio::fs::read(path).await.ok()?;
    let cached: CatalogCache = serde_json::from_slice(&raw)
        .inspect_err(|e| warn!(path = %path.display(), error = %e, "unreadable font cache"))
        .ok()?;
    let fresh = Utc::now() - cached.cached_at < ChronoDuration::days(CACHE_TTL_DAYS);
    (fresh && cached.sort == sort).then_some(cached.families)
}

fn process_families(items: Vec<WebFontItem>) -> Vec<FontFamily> {
    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            let category = if item.category.is_empty() {
                "sans-serif".to_string()
            } else {
                item.category
            };
            FontFamily {
                suitable_for_ui: matches!(category.as_str(), "sans-serif" | "display"),
                suitable_for_headings: matches!(
                    category.as_str(),
                    "serif" | "sans-serif" | "display"
                ),
                suitable_for_body: matches!(category.as_str(), "serif" | "sans-serif"),
                family: item.family,
                category,
                variants: item.variants,
                subsets: item.subsets,
                version: item.version,
                last_modified: item.last_modified,
                files: item.files,
                popularity_rank: idx + 1,
                fallback: false,
            }
        })
        .collect()
}

fn fallback_fonts() -> Vec<FontFamily> {
    let items = [
        ("Arial", "sans-serif"),
        ("Times New Roman", "serif"),
        ("Courier New", "monospace"),
    ]
    .into_iter()
    .map(|(family, category)| WebFontItem {
        family: family.to_string(),
        category: category.to_string(),
        variants: vec!["regular".to_string()],
        ..Default::default()
    })
    .collect();
    process_families(items)
        .into_iter()
        .map(|f| FontFamily {
            fallback: true,
            ..f
        })
        .collect()
}

fn is_coding_font(font: &FontFamily) -> bool {
    let name = font.family.to_lowercase();
    KNOWN_CODING_FONTS
        .iter()
        .any(|known| name.contains(&known.to_lowercase()))
        || font.category == "monospace"
        || name.contains("mono")
        || name.contains("code")
}

pub fn coding_features(family: &str) -> CodingFeatures {
    let name = family.to_lowercase();
    let mut features = CodingFeatures {
        ligatures_support: false,
        zero_distinction: false,
        readability_score: 7,
        best_sizes: vec![10, 11, 12, 13, 14],
        recommended_line_height: 1.4,
    };
    if name.contains("fira code") {
        features.ligatures_support = true;
        features.zero_distinction = true;
        features.readability_score = 9;
        features.best_sizes = (10..=16).collect();
    } else if name.contains("jetbrains mono") {
        features.ligatures_support = true;
        features.zero_distinction = true;
        features.readability_score = 9;
        features.best_sizes = (10..=15).collect();
    } else if name.contains("source code pro") {
        features.zero_distinction = true;
        features.readability_score = 8;
    } else if name.contains("inconsolata") {
        features.readability_score = 8;
        features.best_sizes = (11..=15).collect();
    }
    features
}

pub fn css_url(family: &str) -> String {
    format!(
        "{GOOGLE_FONTS_CSS}?family={}:wght@400;700&display=swap",
        family.replace(' ', "+")
    )
}

fn preview_text(category: &str) -> &'static str {
    match category {
        "monospace" => "fn main() { println!(\"0O 1lI {}[]\"); }",
        "serif" => "The quick brown fox jumps over the lazy dog.",
        "display" => "Bold Headlines Deserve Attention",
        "handwriting" => "Dear reader, thanks for stopping by.",
        _ => "Pack my box with five dozen liquor jugs.",
    }
}

fn characteristics(font: &FontFamily) -> Vec<String> {
    let mut out = vec![format!("{} typeface", font.category)];
    out.push(format!("{} styles", font.variants.len().max(1)));
    if font.variants.iter().any(|v| v.contains("italic")) {
        out.push("includes italics".to_string());
    }
    if font.subsets.len() > 1 {
        out.push(format!("covers {} scripts", font.subsets.len()));
    }
    out
}

fn usage_recommendations(font: &FontFamily) -> Vec<String> {
    let mut out = Vec::new();
    if font.suitable_for_ui {
        out.push("User interface labels and controls".to_string());
    }
    if font.suitable_for_headings {
        out.push("Headings and titles".to_string());
    }
    if font.suitable_for_body {
        out.push("Long-form body text".to_string());
    }
    if font.category == "monospace" {
        out.push("Code editors and terminals".to_string());
    }
    if out.is_empty() {
        out.push("Decorative accents in small doses".to_string());
    }
    out
}

pub fn details_from_catalog(families: &[FontFamily], family: &str) -> FontDetails {
    let wanted = family.to_lowercase();
    let Some((idx, font)) = families
        .iter()
        .enumerate()
        .find(|(_, f)| f.family.to_lowercase() == wanted)
    else {
        return FontDetails {
            family: family.to_string(),
            category: "sans-serif".to_string(),
            variants: vec!["regular".to_string()],
            subsets: vec!["latin".to_string()],
            version: String::new(),
            last_modified: String::new(),
            popularity: None,
            download_urls: Vec::new(),
            css_url: css_url(family),
            preview_text: preview_text("sans-serif").to_string(),
            characteristics: Vec::new(),
            usage_recommendations: Vec::new(),
        };
    };
    FontDetails {
        family: font.family.clone(),
        category: font.category.clone(),
        variants: font.variants.clone(),
        subsets: font.subsets.clone(),
        version: font.version.clone(),
        last_modified: font.last_modified.clone(),
        popularity: Some(idx + 1),
        download_urls: font.files.values().cloned().collect(),
        css_url: css_url(&font.family),
        preview_text: preview_text(&font.category).to_string(),
        characteristics: characteristics(font),
        usage_recommendations: usage_recommendations(font),
    }
}

fn pairing_targets(category: &str) -> &'static [&'static str] {
    match category {
        "serif" => &["sans-serif", "display"],
        "sans-serif" => &["serif", "monospace"],
        "monospace" => &["sans-serif", "serif"],
        "display" => &["serif", "sans-serif"],
        "handwriting" => &["serif", "sans-serif"],
        _ => &["sans-serif"],
    }
}

/// Serif against sans-serif or any decorative face reads as high
/// contrast; anything against monospace as medium.
pub fn contrast_level(primary: &str, secondary: &str) -> ContrastLevel {
    if primary == secondary {
        return ContrastLevel::Low;
    }
    let decorative = |c: &str| matches!(c, "display" | "handwriting");
    match (primary, secondary) {
        ("serif", "sans-serif") | ("sans-serif", "serif") => ContrastLevel::High,
        (p, s) if decorative(p) || decorative(s) => ContrastLevel::High,
        _ => ContrastLevel::Medium,
    }
}

/// 0..=100: a base of 50, up to 25 for the candidate's popularity within
/// the scanned window, 15 for medium contrast or 10 for high, and 10 when
/// both faces share a script subset.
pub fn harmony_score(
    contrast: ContrastLevel,
    candidate_rank: usize,
    shares_subset: bool,
) -> u8 {
    let popularity = PAIRING_SCAN.saturating_sub(candidate_rank.saturating_sub(1)) * 25 / PAIRING_SCAN;
    let contrast_bonus = match contrast {
        ContrastLevel::Low => 0,
        ContrastLevel::Medium => 15,
        ContrastLevel::High => 10,
    };
    let subset_bonus = if shares_subset { 10 } else { 0 };
    (50 + popularity + contrast_bonus + subset_bonus).min(100) as u8
}

fn use_case(primary: &FontDetails, secondary: &FontFamily) -> String {
    match secondary.category.as_str() {
        "monospace" => format!("{} for prose, {} for code samples", primary.family, secondary.family),
        "display" => format!("{} for headlines, {} for body text", secondary.family, primary.family),
        _ if primary.category == "display" || primary.category == "handwriting" => {
            format!("{} for headlines, {} for body text", primary.family, secondary.family)
        }
        _ => format!("{} for headings, {} for body text", primary.family, secondary.family),
    }
}

pub fn pairings_from_catalog(families: &[FontFamily], primary: &str) -> Vec<FontPairing> {
    let primary_details = details_from_catalog(families, primary);
    let targets = pairing_targets(&primary_details.category);

    let mut pairings: Vec<FontPairing> = families
        .iter()
        .take(PAIRING_SCAN)
        .enumerate()
        .filter(|(_, f)| targets.contains(&f.category.as_str()) && f.family != primary_details.family)
        .map(|(idx, f)| {
            let contrast = contrast_level(&primary_details.category, &f.category);
            let shares_subset = f
                .subsets
                .iter()
                .any(|s| primary_details.subsets.contains(s));
            FontPairing {
                secondary_font: f.family.clone(),
                category: f.category.clone(),
                contrast_level: contrast,
                harmony_score: harmony_score(contrast, idx + 1, shares_subset),
                use_case: use_case(&primary_details, f),
            }
        })
        .collect();
    // Stable sort keeps catalog order among equal scores.
    pairings.sort_by(|a, b| b.harmony_score.cmp(&a.harmony_score));
    pairings.truncate(PAIRING_LIMIT);
    pairings
}

pub fn preview_css(family: &str, category: &str, size: u32) -> String {
    let class = family.replace(' ', "-").to_lowercase();
    format!(
        "@import url('{url}');\n\n\
         .font-preview-{class} {{\n  \
           font-family: '{family}', {category};\n  \
           font-size: {size}px;\n  \
           line-height: 1.4;\n  \
           margin: 10px 0;\n  \
           padding: 15px;\n  \
           border: 1px solid #e0e0e0;\n  \
           border-radius: 4px;\n  \
           background: #f9f9f9;\n\
         }}\n\n\
         .font-preview-{class}:hover {{\n  \
           background: #f0f0f0;\n  \
           border-color: #c0c0c0;\n\
         }}\n",
        url = css_url(family),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(family: &str, category: &str) -> WebFontItem {
        WebFontItem {
            family: family.to_string(),
            category: category.to_string(),
            variants: vec!["regular".into(), "italic".into()],
            subsets: vec!["latin".into()],
            ..Default::default()
        }
    }

    fn catalog() -> Vec<FontFamily> {
        process_families(vec![
            item("Roboto", "sans-serif"),
            item("Merriweather", "serif"),
            item("Fira Code", "monospace"),
            item("Lobster", "display"),
            item("Open Sans", "sans-serif"),
            item("Playfair Display", "serif"),
        ])
    }

    #[test]
    fn families_get_rank_and_suitability() {
        let fams = catalog();
        assert_eq!(fams[0].popularity_rank, 1);
        assert!(fams[0].suitable_for_ui && fams[0].suitable_for_body);
        assert!(!fams[1].suitable_for_ui && fams[1].suitable_for_headings);
        assert!(!fams[2].suitable_for_body);
        assert!(fams[3].suitable_for_ui && !fams[3].suitable_for_body);
    }

    #[test]
    fn coding_filter_and_features() {
        let coding: Vec<_> = catalog().into_iter().filter(is_coding_font).collect();
        assert_eq!(coding.len(), 1);
        let f = coding_features(&coding[0].family);
        assert!(f.ligatures_support && f.zero_distinction);
        assert_eq!(f.readability_score, 9);
        assert_eq!(coding_features("Courier Prime").readability_score, 7);
    }

    #[test]
    fn details_lookup_is_case_insensitive() {
        let d = details_from_catalog(&catalog(), "merriweather");
        assert_eq!(d.family, "Merriweather");
        assert_eq!(d.popularity, Some(2));
        assert!(d.characteristics.iter().any(|c| c == "includes italics"));

        let unknown = details_from_catalog(&catalog(), "Nope Sans");
        assert_eq!(unknown.popularity, None);
        assert_eq!(unknown.category, "sans-serif");
        assert!(unknown.css_url.contains("family=Nope+Sans"));
    }

    #[test]
    fn pairings_follow_category_rules() {
        let pairs = pairings_from_catalog(&catalog(), "Merriweather");
        let names: Vec<_> = pairs.iter().map(|p| p.secondary_font.as_str()).collect();
        // serif pairs with sans-serif and display only.
        assert_eq!(names.len(), 3);
        assert!(!names.contains(&"Playfair Display"));
        assert!(!names.contains(&"Fira Code"));
        assert!(pairs.windows(2).all(|w| w[0].harmony_score >= w[1].harmony_score));
        assert!(pairs.iter().all(|p| p.harmony_score <= 100));
    }

    #[test]
    fn contrast_rules() {
        assert_eq!(contrast_level("serif", "serif"), ContrastLevel::Low);
        assert_eq!(contrast_level("serif", "sans-serif"), ContrastLevel::High);
        assert_eq!(contrast_level("serif", "display"), ContrastLevel::High);
        assert_eq!(contrast_level("sans-serif", "monospace"), ContrastLevel::Medium);
    }

    #[test]
    fn harmony_rewards_popularity() {
        let top = harmony_score(ContrastLevel::Medium, 1, true);
        let tail = harmony_score(ContrastLevel::Medium, 50, true);
        assert_eq!(top, 100);
        assert!(top > tail);
        assert_eq!(harmony_score(ContrastLevel::Low, 200, false), 50);
    }

    #[test]
    fn preview_css_imports_family() {
        let css = preview_css("Fira Code", "monospace", 16);
        assert!(css.starts_with("@import url('https://fonts.googleapis.com/css2?family=Fira+Code"));
        assert!(css.contains(".font-preview-fira-code {"));
        assert!(css.contains("font-size: 16px;"));
    }

    #[tokio::test]
    async fn without_key_falls_back_to_system_fonts() {
        let dir = tempfile::tempdir().unwrap();
        let svc = FontsService::new(reqwest::Client::new(), &Config::default(), None, dir.path());
        let fams = svc.families(DEFAULT_SORT).await;
        assert_eq!(fams.len(), 3);
        assert!(fams.iter().all(|f| f.fallback));
        assert_eq!(svc.coding_fonts().await.len(), 1);
        assert_eq!(svc.system_fonts().len(), 7);
    }

    #[tokio::test]
    async fn fresh_cache_is_used_and_stale_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE);
        let snapshot = CatalogCache {
            cached_at: Utc::now(),
            sort: DEFAULT_SORT.into(),
            families: catalog(),
        };
        std::fs::write(&path, serde_json::to_vec(&snapshot).unwrap()).unwrap();
        assert_eq!(load_cache(&path, DEFAULT_SORT).await.map(|f| f.len()), Some(6));
        assert!(load_cache(&path, "alpha").await.is_none());

        let stale = CatalogCache {
            cached_at: Utc::now() - ChronoDuration::days(8),
            ..snapshot
        };
        std::fs::write(&path, serde_json::to_vec(&stale).unwrap()).unwrap();
        assert!(load_cache(&path, DEFAULT_SORT).await.is_none());
    }
}
