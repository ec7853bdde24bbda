mod crawler;
mod error;
mod http;
mod item;
mod parser;
mod settings;

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;

use settings::{AssetCategory, Locale, SelectionConfig, SiteConfig};
use crawler::Crawler;

#[derive(Parser, Debug)]
#[command(name = "sv_card_scraper", about = "Download card art and voice lines from the card catalog")]
struct Cli {
    /// Skip the bordered art (base and evolved)
    #[arg(long)]
    no_bordered: bool,
    /// Skip the unevolved art (raw and bordered)
    #[arg(long)]
    no_base: bool,
    /// Skip the evolved art (raw and bordered)
    #[arg(long)]
    no_evo: bool,
    /// Skip the raw, borderless art
    #[arg(long, alias = "no-law")]
    no_raw: bool,
    /// Skip every voice line
    #[arg(long)]
    no_sound: bool,
    /// Skip Japanese voice lines
    #[arg(long)]
    no_jp: bool,
    /// Skip English voice lines
    #[arg(long)]
    no_en: bool,
    /// Skip Korean voice lines
    #[arg(long)]
    no_ko: bool,
    /// Output directory, created if missing
    #[arg(short, long, default_value = settings::DEFAULT_OUTPUT_ROOT)]
    path: PathBuf,
    /// Number of cards processed in parallel
    #[arg(short = 'c', long = "count", default_value_t = settings::DEFAULT_CONCURRENCY)]
    count: usize,
    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    fn selection(&self) -> SelectionConfig {
        let mut disabled = Vec::new();
        if self.no_bordered {
            disabled.extend([AssetCategory::BaseArtWithBorder, AssetCategory::EvoArtWithBorder]);
        }
        if self.no_base {
            disabled.extend([AssetCategory::BaseArt, AssetCategory::BaseArtWithBorder]);
        }
        if self.no_evo {
            disabled.extend([AssetCategory::EvoArt, AssetCategory::EvoArtWithBorder]);
        }
        if self.no_raw {
            disabled.extend([AssetCategory::BaseArt, AssetCategory::EvoArt]);
        }
        if self.no_sound {
            disabled.extend(Locale::ALL.map(AssetCategory::Voice));
        }
        for (skip, locale) in [
            (self.no_jp, Locale::Japanese),
            (self.no_en, Locale::English),
            (self.no_ko, Locale::Korean),
        ] {
            if skip {
                disabled.push(AssetCategory::Voice(locale));
            }
        }

        disabled.into_iter().fold(
            SelectionConfig::new()
                .with_output_root(&self.path)
                .with_concurrency(self.count),
            SelectionConfig::disable,
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let selection = cli.selection();
    let site = SiteConfig::from_env()?.resolve()?;

    let report = Crawler::new(site, selection)?
        .show_progress(!cli.no_progress)
        .run()
        .await;

    println!(
        "Done: {} cards ({} stored, {} failed) in {:.1}s",
        report.discovered,
        report.stored,
        report.failed,
        t0.elapsed().as_secs_f64()
    );
    // A failed run is reported on stdout; the exit status stays zero.
    if let Some(e) = report.first_error() {
        println!("Error {}", e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> SelectionConfig {
        let argv = std::iter::once("sv_card_scraper").chain(args.iter().copied());
        Cli::parse_from(argv).selection()
    }

    #[test]
    fn defaults() {
        let config = parse(&[]);
        assert_eq!(config.enabled().count(), AssetCategory::ALL.len());
        assert_eq!(config.output_root(), std::path::Path::new("work"));
        assert_eq!(config.concurrency_limit(), 20);
    }

    #[test]
    fn flags_accumulate() {
        let config = parse(&["--no-bordered", "--no-jp", "--no-ko", "-p", "out", "-c", "4"]);
        let enabled: Vec<_> = config.enabled().collect();
        assert_eq!(
            enabled,
            vec![
                AssetCategory::BaseArt,
                AssetCategory::EvoArt,
                AssetCategory::Voice(Locale::English),
            ]
        );
        assert_eq!(config.concurrency_limit(), 4);
    }

    #[test]
    fn no_sound_and_raw_alias() {
        let config = parse(&["--no-sound", "--no-law"]);
        let enabled: Vec<_> = config.enabled().collect();
        assert_eq!(
            enabled,
            vec![AssetCategory::BaseArtWithBorder, AssetCategory::EvoArtWithBorder]
        );
    }
}
