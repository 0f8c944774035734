//! Font command handlers

use crate::cli::output::{field, heading, notice, print_json, print_table, truncate};
use crate::cli::{AppContext, FontsCommands};
use crate::error::Result;
use crate::service::FontsService;
use crate::types::fonts::FontFamily;
use tabled::Tabled;

#[derive(Tabled)]
struct FamilyRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Family")]
    family: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Styles")]
    styles: usize,
    #[tabled(rename = "Use for")]
    use_for: String,
}

#[derive(Tabled)]
struct CodingRow {
    #[tabled(rename = "Family")]
    family: String,
    #[tabled(rename = "Ligatures")]
    ligatures: bool,
    #[tabled(rename = "Slashed zero")]
    zero: bool,
    #[tabled(rename = "Readability")]
    readability: String,
    #[tabled(rename = "Sizes")]
    sizes: String,
}

#[derive(Tabled)]
struct PairingRow {
    #[tabled(rename = "Secondary")]
    secondary: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Contrast")]
    contrast: String,
    #[tabled(rename = "Harmony")]
    harmony: u8,
    #[tabled(rename = "Use case")]
    use_case: String,
}

#[derive(Tabled)]
struct SystemRow {
    #[tabled(rename = "Family")]
    family: &'static str,
    #[tabled(rename = "Category")]
    category: &'static str,
    #[tabled(rename = "Platforms")]
    platforms: String,
    #[tabled(rename = "Coding")]
    coding: bool,
}

fn use_for(f: &FontFamily) -> String {
    let mut uses = Vec::new();
    if f.suitable_for_ui {
        uses.push("ui");
    }
    if f.suitable_for_headings {
        uses.push("headings");
    }
    if f.suitable_for_body {
        uses.push("body");
    }
    if uses.is_empty() { "-".into() } else { uses.join(", ") }
}

fn offline_notice(families: &[FontFamily]) {
    if families.iter().any(|f| f.fallback) {
        notice("Font catalog unavailable: showing system fonts. Set GOOGLE_FONTS_API_KEY for the full catalog.");
    }
}

pub async fn handle(ctx: &AppContext, cmd: FontsCommands) -> Result<()> {
    let service = FontsService::new(
        ctx.http()?,
        ctx.config(),
        ctx.keys.fonts.clone(),
        ctx.data_dir.fonts_dir(),
    );

    match cmd {
        FontsCommands::List { sort, limit } => {
            let families = service.families(&sort).await;
            if ctx.json {
                return print_json(&families[..limit.min(families.len())]);
            }
            print_table(
                families
                    .iter()
                    .take(limit)
                    .map(|f| FamilyRow {
                        rank: f.popularity_rank,
                        family: f.family.clone(),
                        category: f.category.clone(),
                        styles: f.variants.len(),
                        use_for: use_for(f),
                    })
                    .collect(),
            );
            println!("\nShowing {} of {}", limit.min(families.len()), families.len());
            offline_notice(&families);
        }
        FontsCommands::Coding => {
            let fonts = service.coding_fonts().await;
            if ctx.json {
                return print_json(&fonts);
            }
            print_table(
                fonts
                    .iter()
                    .map(|c| CodingRow {
                        family: c.font.family.clone(),
                        ligatures: c.features.ligatures_support,
                        zero: c.features.zero_distinction,
                        readability: format!("{}/10", c.features.readability_score),
                        sizes: format!(
                            "{}-{}px, line height {}",
                            c.features.best_sizes.first().copied().unwrap_or_default(),
                            c.features.best_sizes.last().copied().unwrap_or_default(),
                            c.features.recommended_line_height
                        ),
                    })
                    .collect(),
            );
        }
        FontsCommands::Show { family } => {
            let d = service.details(&family).await;
            if ctx.json {
                return print_json(&d);
            }
            heading(&d.family);
            field("Category", &d.category);
            field(
                "Popularity",
                d.popularity
                    .map(|p| format!("#{p}"))
                    .unwrap_or_else(|| "not in catalog".to_string()),
            );
            field("Styles", d.variants.join(", "));
            field("Scripts", d.subsets.join(", "));
            if !d.version.is_empty() {
                field("Version", &d.version);
            }
            field("CSS", &d.css_url);
            field("Preview", &d.preview_text);
            for c in &d.characteristics {
                field("Trait", c);
            }
            for r in &d.usage_recommendations {
                field("Good for", r);
            }
            for url in &d.download_urls {
                field("Download", url);
            }
        }
        FontsCommands::Pair { family } => {
            let pairs = service.pairings(&family).await;
            if ctx.json {
                return print_json(&pairs);
            }
            if pairs.is_empty() {
                notice(&format!("No pairing candidates found for {family}."));
                return Ok(());
            }
            heading(&format!("Pairings for {family}"));
            print_table(
                pairs
                    .into_iter()
                    .map(|p| PairingRow {
                        secondary: p.secondary_font,
                        category: p.category,
                        contrast: format!("{:?}", p.contrast_level).to_lowercase(),
                        harmony: p.harmony_score,
                        use_case: truncate(&p.use_case, 48),
                    })
                    .collect(),
            );
        }
        FontsCommands::Preview { family, size } => {
            let css = service.preview_css(&family, size).await;
            if ctx.json {
                return print_json(&serde_json::json!({ "family": family, "size": size, "css": css }));
            }
            print!("{css}");
        }
        FontsCommands::System => {
            let fonts = service.system_fonts();
            if ctx.json {
                return print_json(fonts);
            }
            print_table(
                fonts
                    .iter()
                    .map(|f| SystemRow {
                        family: f.family,
                        category: f.category,
                        platforms: f.platforms.join(", "),
                        coding: f.suitable_for_coding,
                    })
                    .collect(),
            );
        }
    }
    Ok(())
}
