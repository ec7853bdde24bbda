use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::settings::Site;

static BORDERED_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r".*C_(\d+)\.png").unwrap());
static RAW_PATH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r".*/0/(.*)").unwrap());

/// Evolved-art URLs synthesized from the base-art ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvoArt {
    pub art: String,
    pub art_bordered: String,
}

/// Derive the evolved-art URLs from the base bordered and raw art URLs.
///
/// Fails when either anchor does not have its expected shape, which means
/// the page layout changed or the anchor was never found.
pub fn evo_art(page_url: &str, bordered: &str, raw: &str, site: &Site) -> Result<EvoArt> {
    let card_id = BORDERED_ID_RE
        .captures(bordered)
        .and_then(|c| c.get(1))
        .ok_or_else(|| {
            Error::shape(page_url, format!("bordered art URL {bordered:?} has no card id"))
        })?
        .as_str();
    let raw_path = RAW_PATH_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .ok_or_else(|| Error::shape(page_url, format!("raw art URL {raw:?} has no image path")))?
        .as_str();

    Ok(EvoArt {
        art: format!("{}/getRawImage/1/0/{}", site.origin(), raw_path),
        art_bordered: format!(
            "{}/image/card/{}/E_{}.png",
            site.asset_host, site.art_locale, card_id
        ),
    })
}
