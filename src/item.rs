use std::collections::BTreeMap;
use std::io::ErrorKind;

use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::http::Fetcher;
use crate::parser::assets::{self, Tracks};
use crate::parser::derive;
use crate::settings::{AssetCategory, Locale, SelectionConfig, Site};

/// One card: its page, the asset URLs found on it, and the lock that
/// serializes storing it.
#[derive(Debug)]
pub struct Item {
    pub name: String,
    pub url: Url,
    pub base_art: String,
    pub base_art_bordered: String,
    pub evo_art: String,
    pub evo_art_bordered: String,
    pub voices: BTreeMap<Locale, Tracks>,
    store_lock: Mutex<()>,
}

impl Item {
    /// Fetch a card page and extract everything needed to store it.
    pub async fn fetch(fetcher: &Fetcher, site: &Site, url: Url) -> Result<Self> {
        let html = fetcher.fetch_page(&url).await?;
        Self::from_page(url, &html, site)
    }

    pub fn from_page(url: Url, html: &str, site: &Site) -> Result<Self> {
        let name = item_name(&url)?;
        let found = assets::extract(url.as_str(), html, site)?;
        let base_art_bordered = found.base_art_bordered.unwrap_or_default();
        let base_art = found.base_art.unwrap_or_default();
        let evo = derive::evo_art(url.as_str(), &base_art_bordered, &base_art, site)?;

        Ok(Self {
            name,
            url,
            base_art,
            base_art_bordered,
            evo_art: evo.art,
            evo_art_bordered: evo.art_bordered,
            voices: found.voices,
            store_lock: Mutex::new(()),
        })
    }

    /// Download every enabled asset into `<output_root>/<name>/`.
    ///
    /// All downloads are attempted even after a failure. Only the first
    /// error is returned; the rest are logged.
    pub async fn persist(&self, fetcher: &Fetcher, config: &SelectionConfig) -> Result<()> {
        let _guard = self.store_lock.lock().await;
        debug!("Storing {} from {}", self.name, self.url);

        let dir = config.output_root().join(&self.name);
        match tokio::fs::create_dir(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(Error::io(dir, e)),
        }

        let mut first_error = None;
        for category in config.enabled() {
            for (url, file_name) in self.downloads(category) {
                let dest = dir.join(&file_name);
                match fetcher.download(&url, &dest).await {
                    Ok(()) => debug!("{}: stored {}", self.name, file_name),
                    Err(e) if first_error.is_none() => first_error = Some(e),
                    Err(e) => warn!("{}: {}", self.name, e),
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// (source URL, file name) pairs for one category.
    fn downloads(&self, category: AssetCategory) -> Vec<(String, String)> {
        let art = |url: &str| {
            let file = category.art_file_name().unwrap_or_default();
            vec![(url.to_string(), file.to_string())]
        };
        match category {
            AssetCategory::BaseArtWithBorder => art(&self.base_art_bordered),
            AssetCategory::BaseArt => art(&self.base_art),
            AssetCategory::EvoArt => art(&self.evo_art),
            AssetCategory::EvoArtWithBorder => art(&self.evo_art_bordered),
            AssetCategory::Voice(locale) => self
                .voices
                .get(&locale)
                .into_iter()
                .flatten()
                .map(|(track, url)| {
                    let track = track.replace(['/', '\\'], "_");
                    (url.clone(), format!("{}-{}.mp3", track, locale.suffix()))
                })
                .collect(),
        }
    }
}

/// Last path segment of the card URL.
fn item_name(url: &Url) -> Result<String> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::shape(url.as_str(), "card URL has no name segment"))
}
