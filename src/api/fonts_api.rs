use crate::api::read_json;
use crate::config::endpoint;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;
use url::Url;

/// One family from the Google Fonts `webfonts` listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebFontItem {
    pub family: String,
    pub category: String,
    pub variants: Vec<String>,
    pub subsets: Vec<String>,
    pub version: String,
    pub last_modified: String,
    /// Variant name to file URL.
    pub files: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebFontList {
    pub items: Vec<WebFontItem>,
}

/// Stateless Google Fonts endpoints.
pub struct FontsEndpoints;

impl FontsEndpoints {
    /// List all families ordered by `sort` (`popularity`, `alpha`, `date`,
    /// `style`, `trending`).
    pub async fn webfonts(
        client: &reqwest::Client,
        base: &Url,
        api_key: &str,
        sort: &str,
    ) -> Result<Vec<WebFontItem>> {
        let resp = client
            .get(endpoint(base, "webfonts")?)
            .query(&[("key", api_key), ("sort", sort)])
            .send()
            .await?;
        let list: WebFontList = read_json(resp).await?;
        info!(count = list.items.len(), sort, "font families fetched");
        Ok(list.items)
    }
}
