pub mod assets;
pub mod derive;
pub mod front;

use std::sync::LazyLock;

use scraper::Selector;

/// `a[href]` on both the front page and card pages.
pub(crate) static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").unwrap());
