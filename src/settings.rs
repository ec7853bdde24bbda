use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use config::{Config, Environment};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

pub const DEFAULT_OUTPUT_ROOT: &str = "work";
pub const DEFAULT_CONCURRENCY: usize = 20;
const ENV_PREFIX: &str = "SVCARDS";

/// Voice-line localizations published for every card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Locale {
    Japanese,
    English,
    Korean,
}

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::Japanese, Locale::English, Locale::Korean];

    /// Path fragment that identifies the locale inside an audio source URL.
    pub fn marker(self) -> &'static str {
        match self {
            Locale::Japanese => "/j/",
            Locale::English => "/e/",
            Locale::Korean => "/k/",
        }
    }

    /// Suffix used in the stored track file name.
    pub fn suffix(self) -> &'static str {
        match self {
            Locale::Japanese => "jp",
            Locale::English => "en",
            Locale::Korean => "ko",
        }
    }
}

/// One kind of downloadable file. Declaration order is the order in which
/// a card's assets are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetCategory {
    BaseArtWithBorder,
    BaseArt,
    EvoArt,
    EvoArtWithBorder,
    Voice(Locale),
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 7] = [
        AssetCategory::BaseArtWithBorder,
        AssetCategory::BaseArt,
        AssetCategory::EvoArt,
        AssetCategory::EvoArtWithBorder,
        AssetCategory::Voice(Locale::Japanese),
        AssetCategory::Voice(Locale::English),
        AssetCategory::Voice(Locale::Korean),
    ];

    /// Fixed file name for art categories; voice tracks are named per track.
    pub fn art_file_name(self) -> Option<&'static str> {
        match self {
            AssetCategory::BaseArtWithBorder => Some("base-with-border.png"),
            AssetCategory::BaseArt => Some("base-art.png"),
            AssetCategory::EvoArt => Some("evo-art.png"),
            AssetCategory::EvoArtWithBorder => Some("evo-art-with-border.png"),
            AssetCategory::Voice(_) => None,
        }
    }
}

/// Which assets to store, where, and how many cards to work on at once.
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    disabled: BTreeSet<AssetCategory>,
    output_root: PathBuf,
    concurrency_limit: usize,
}

impl SelectionConfig {
    pub fn new() -> Self {
        Self {
            disabled: BTreeSet::new(),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            concurrency_limit: DEFAULT_CONCURRENCY,
        }
    }

    pub fn disable(mut self, category: AssetCategory) -> Self {
        self.disabled.insert(category);
        self
    }

    pub fn with_output_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_root = path.into();
        self
    }

    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit.max(1);
        self
    }

    pub fn is_enabled(&self, category: AssetCategory) -> bool {
        !self.disabled.contains(&category)
    }

    pub fn enabled(&self) -> impl Iterator<Item = AssetCategory> + '_ {
        AssetCategory::ALL
            .into_iter()
            .filter(|c| self.is_enabled(*c))
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the catalog lives. Every field can be overridden from the
/// environment, e.g. `SVCARDS_SITE_URL=http://localhost:8080`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub site_url: String,
    pub front_page_path: String,
    pub item_path_prefix: String,
    pub asset_host: String,
    /// Locale baked into the evolved bordered-art URL. Only one is supported.
    pub art_locale: String,
    pub user_agent: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_url: "http://sv.bagoum.com".into(),
            front_page_path: "/cardSort".into(),
            item_path_prefix: "/card".into(),
            asset_host: "https://shadowverse-portal.com".into(),
            art_locale: "ja".into(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/72.0.3626.81 Safari/537.36"
                .into(),
        }
    }
}

impl SiteConfig {
    pub fn from_env() -> Result<Self> {
        let settings = Config::builder()
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn resolve(self) -> Result<Site> {
        let base = parse_url(&self.site_url)?;
        let front_page = base
            .join(&self.front_page_path)
            .map_err(|source| Error::InvalidUrl {
                url: self.front_page_path.clone(),
                source,
            })?;
        Ok(Site {
            base,
            front_page,
            item_path_prefix: self.item_path_prefix,
            asset_host: self.asset_host.trim_end_matches('/').to_string(),
            art_locale: self.art_locale,
            user_agent: self.user_agent,
        })
    }
}

/// `SiteConfig` with its URLs parsed.
#[derive(Debug, Clone)]
pub struct Site {
    pub base: Url,
    pub front_page: Url,
    pub item_path_prefix: String,
    pub asset_host: String,
    pub art_locale: String,
    pub user_agent: String,
}

impl Site {
    /// Resolve a site-relative reference (or absolute URL) against the base.
    pub fn join(&self, reference: &str) -> Result<Url> {
        self.base.join(reference).map_err(|source| Error::InvalidUrl {
            url: reference.to_string(),
            source,
        })
    }

    /// Base URL without a trailing slash, for string templates.
    pub fn origin(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|source| Error::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_enabled_by_default() {
        let config = SelectionConfig::new();
        assert_eq!(config.enabled().count(), AssetCategory::ALL.len());
        assert_eq!(config.output_root(), Path::new("work"));
        assert_eq!(config.concurrency_limit(), 20);
    }

    #[test]
    fn disabled_categories_are_skipped_in_store_order() {
        let config = SelectionConfig::new()
            .disable(AssetCategory::BaseArt)
            .disable(AssetCategory::Voice(Locale::English));
        let enabled: Vec<_> = config.enabled().collect();
        assert_eq!(
            enabled,
            vec![
                AssetCategory::BaseArtWithBorder,
                AssetCategory::EvoArt,
                AssetCategory::EvoArtWithBorder,
                AssetCategory::Voice(Locale::Japanese),
                AssetCategory::Voice(Locale::Korean),
            ]
        );
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        assert_eq!(SelectionConfig::new().with_concurrency(0).concurrency_limit(), 1);
    }

    #[test]
    fn default_site_resolves() {
        let site = SiteConfig::default().resolve().unwrap();
        assert_eq!(site.front_page.as_str(), "http://sv.bagoum.com/cardSort");
        assert_eq!(site.origin(), "http://sv.bagoum.com");
        assert_eq!(
            site.join("/getRawImage/0/0/100011010").unwrap().as_str(),
            "http://sv.bagoum.com/getRawImage/0/0/100011010"
        );
    }

    #[test]
    fn environment_overrides_site_settings() {
        std::env::set_var("SVCARDS_SITE_URL", "http://localhost:9999");
        std::env::set_var("SVCARDS_ART_LOCALE", "en");
        let loaded = SiteConfig::from_env();
        std::env::remove_var("SVCARDS_SITE_URL");
        std::env::remove_var("SVCARDS_ART_LOCALE");

        let site = loaded.unwrap();
        assert_eq!(site.site_url, "http://localhost:9999");
        assert_eq!(site.art_locale, "en");
        assert_eq!(site.front_page_path, "/cardSort");

        let site = site.resolve().unwrap();
        assert_eq!(site.front_page.as_str(), "http://localhost:9999/cardSort");
    }

    #[test]
    fn bad_site_url_is_rejected() {
        let site = SiteConfig {
            site_url: "not a url".into(),
            ..SiteConfig::default()
        };
        assert!(matches!(site.resolve(), Err(Error::InvalidUrl { .. })));
    }
}
