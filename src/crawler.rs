use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::http::Fetcher;
use crate::item::Item;
use crate::parser::front;
use crate::settings::{SelectionConfig, Site};

/// Outcome of one crawl.
#[derive(Debug, Default)]
pub struct RunReport {
    pub discovered: usize,
    pub stored: usize,
    pub failed: usize,
    /// Most pool slots held at the same time.
    pub peak_in_flight: usize,
    /// Every recorded error, in the order it was recorded.
    pub errors: Vec<Error>,
}

impl RunReport {
    /// The earliest error recorded anywhere in the run.
    pub fn first_error(&self) -> Option<&Error> {
        self.errors.first()
    }
}

/// Errors recorded by concurrent workers. The first one recorded stays first.
#[derive(Default)]
struct ErrorLog(Mutex<Vec<Error>>);

impl ErrorLog {
    fn record(&self, error: Error) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(error);
    }

    fn into_inner(self) -> Vec<Error> {
        self.0.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Counts held pool slots and remembers the high-water mark.
#[derive(Default)]
struct SlotGauge {
    held: AtomicUsize,
    peak: AtomicUsize,
}

impl SlotGauge {
    fn acquired(&self) {
        let now = self.held.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn released(&self) {
        self.held.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A held pool slot. Dropping it, on return or on panic, counts the card as
/// done and frees the slot.
struct SlotLease {
    gauge: Arc<SlotGauge>,
    pb: ProgressBar,
    _permit: OwnedSemaphorePermit,
}

impl SlotLease {
    fn new(permit: OwnedSemaphorePermit, gauge: Arc<SlotGauge>, pb: ProgressBar) -> Self {
        gauge.acquired();
        Self {
            gauge,
            pb,
            _permit: permit,
        }
    }
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        self.pb.inc(1);
        self.gauge.released();
    }
}

/// Drives one crawl: front page, then every card page on a bounded pool.
pub struct Crawler {
    site: Arc<Site>,
    config: Arc<SelectionConfig>,
    fetcher: Fetcher,
    show_progress: bool,
}

impl Crawler {
    pub fn new(site: Site, config: SelectionConfig) -> Result<Self> {
        let fetcher = Fetcher::new(&site.user_agent)?;
        Ok(Self {
            site: Arc::new(site),
            config: Arc::new(config),
            fetcher,
            show_progress: false,
        })
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Crawl the catalog once. Never fails as a whole; every problem ends up
    /// in the report and the remaining cards are still processed.
    pub async fn run(self) -> RunReport {
        let errors = Arc::new(ErrorLog::default());
        let mut report = RunReport::default();

        let root = self.config.output_root();
        if let Err(e) = tokio::fs::create_dir_all(root).await {
            errors.record(Error::io(root, e));
            return finish(report, errors);
        }

        info!("Fetching front page: {}", self.site.front_page);
        let items = match self.fetcher.fetch_page(&self.site.front_page).await {
            Ok(html) => front::discover_items(&html, &self.site),
            Err(e) => {
                warn!("Front page failed: {}", e);
                errors.record(e);
                return finish(report, errors);
            }
        };
        report.discovered = items.len();
        info!("Discovered {} cards", items.len());

        let pb = self.progress_bar(items.len());
        let limit = self.config.concurrency_limit();
        let slots = Arc::new(Semaphore::new(limit));
        let gauge = Arc::new(SlotGauge::default());
        let mut workers = JoinSet::new();

        for url in items {
            // Blocks discovery while every slot is taken.
            let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
                break;
            };
            let lease = SlotLease::new(permit, Arc::clone(&gauge), pb.clone());

            let fetcher = self.fetcher.clone();
            let site = Arc::clone(&self.site);
            let config = Arc::clone(&self.config);
            let errors = Arc::clone(&errors);

            workers.spawn(async move {
                let _lease = lease;
                let outcome = process_item(&fetcher, &site, &config, url.clone()).await;
                let stored = match outcome {
                    Ok(name) => {
                        info!("Stored {}", name);
                        true
                    }
                    Err(e) => {
                        warn!("Card {} failed: {}", url, e);
                        errors.record(e);
                        false
                    }
                };
                stored
            });
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(true) => report.stored += 1,
                Ok(false) => report.failed += 1,
                Err(e) => {
                    report.failed += 1;
                    errors.record(Error::Worker(e));
                }
            }
        }
        pb.finish_and_clear();

        report.peak_in_flight = gauge.peak.load(Ordering::SeqCst);
        info!(
            "Crawl finished: {} discovered, {} stored, {} failed",
            report.discovered, report.stored, report.failed
        );
        finish(report, errors)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        pb.set_style(style);
        pb
    }
}

async fn process_item(
    fetcher: &Fetcher,
    site: &Site,
    config: &SelectionConfig,
    url: Url,
) -> Result<String> {
    let item = Item::fetch(fetcher, site, url).await?;
    item.persist(fetcher, config).await?;
    Ok(item.name)
}

fn finish(mut report: RunReport, errors: Arc<ErrorLog>) -> RunReport {
    // Every worker has been joined, so this is the last reference.
    report.errors = match Arc::try_unwrap(errors) {
        Ok(log) => log.into_inner(),
        Err(shared) => {
            let mut errors = shared.0.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *errors)
        }
    };
    report
}
