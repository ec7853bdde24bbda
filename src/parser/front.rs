use std::collections::HashSet;

use scraper::Html;
use tracing::warn;
use url::Url;

use super::LINK_SELECTOR;
use crate::settings::Site;

/// Card page URLs linked from the front page, in page order, without
/// duplicates and without the front page itself.
pub fn discover_items(html: &str, site: &Site) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for link in document.select(&LINK_SELECTOR) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if !href.starts_with(&site.item_path_prefix) {
            continue;
        }
        let url = match site.join(href) {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping card link: {}", e);
                continue;
            }
        };
        if url == site.front_page || !seen.insert(url.clone()) {
            continue;
        }
        items.push(url);
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SiteConfig;

    fn site() -> Site {
        SiteConfig::default().resolve().unwrap()
    }

    #[test]
    fn front_page_links() {
        let html = std::fs::read_to_string("tests/fixtures/front.html").unwrap();
        let items = discover_items(&html, &site());
        let urls: Vec<&str> = items.iter().map(Url::as_str).collect();
        assert_eq!(
            urls,
            vec![
                "http://sv.bagoum.com/cards/forest-bat",
                "http://sv.bagoum.com/cards/goblin",
            ]
        );
    }

    #[test]
    fn no_card_links() {
        let items = discover_items(r#"<a href="/about">About</a><a>bare</a>"#, &site());
        assert!(items.is_empty());
    }
}
