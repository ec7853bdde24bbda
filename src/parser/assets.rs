use std::collections::BTreeMap;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::LINK_SELECTOR;
use crate::error::{Error, Result};
use crate::settings::{Locale, Site};

static ROW_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static AUDIO_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("audio").unwrap());
static SOURCE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("source[src]").unwrap());

const RAW_IMAGE_PREFIX: &str = "/getRawImage";

/// Voice lines of one locale, keyed by track name.
pub type Tracks = BTreeMap<String, String>;

/// Asset references found directly on a card page.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PageAssets {
    pub base_art: Option<String>,
    pub base_art_bordered: Option<String>,
    pub voices: BTreeMap<Locale, Tracks>,
}

/// Scan a card page for art links and voice-line rows.
///
/// Later matches overwrite earlier ones for the art links. A voice row whose
/// first cell has no name token is treated as a markup change and fails.
pub fn extract(page_url: &str, html: &str, site: &Site) -> Result<PageAssets> {
    let document = Html::parse_document(html);
    let mut assets = PageAssets::default();

    for link in document.select(&LINK_SELECTOR) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if href.starts_with(&site.asset_host) {
            assets.base_art_bordered = Some(href.to_string());
        }
        if href.starts_with(RAW_IMAGE_PREFIX) {
            assets.base_art = Some(site.join(href)?.to_string());
        }
    }

    for row in document.select(&ROW_SELECTOR) {
        if row.select(&AUDIO_SELECTOR).next().is_none() {
            continue;
        }
        let name = track_name(row).ok_or_else(|| {
            Error::shape(page_url, "voice row without a track name in its first cell")
        })?;
        for source in row.select(&SOURCE_SELECTOR) {
            let Some(src) = source.value().attr("src") else {
                continue;
            };
            let locales: Vec<Locale> = Locale::ALL
                .into_iter()
                .filter(|locale| src.contains(locale.marker()))
                .collect();
            if locales.is_empty() {
                continue;
            }
            let url = site.join(src)?;
            for locale in locales {
                assets
                    .voices
                    .entry(locale)
                    .or_default()
                    .insert(name.clone(), url.to_string());
            }
        }
    }

    Ok(assets)
}

/// Leading whitespace-delimited token of the row's first cell.
fn track_name(row: ElementRef<'_>) -> Option<String> {
    let cell = row.select(&CELL_SELECTOR).next()?;
    let text: String = cell.text().collect();
    text.split_whitespace().next().map(str::to_string)
}
