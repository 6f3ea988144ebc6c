//! Bookcrawl CLI - book catalog downloader.

use anyhow::{Context, Result};
use bookcrawl::config::Config;
use bookcrawl::console::Console;
use bookcrawl::{
    CategoryCrawler, DescriptionStore, DownloadOrchestrator, IdRange, PageFetcher, RunOptions,
    SourceProducer,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Download books, covers and descriptions from an online library.
#[derive(Parser, Debug)]
#[command(name = "bookcrawl")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Folder that receives books/, images/ and the description file.
    #[arg(long, global = true)]
    dest_folder: Option<PathBuf>,

    /// Description file path (relative paths are inside the dest folder).
    #[arg(long, global = true)]
    json_path: Option<PathBuf>,

    /// Do not download book texts.
    #[arg(long, global = true)]
    skip_txt: bool,

    /// Do not download cover images.
    #[arg(long, global = true)]
    skip_imgs: bool,

    /// Use this config file instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download a range of book ids.
    Ids {
        /// First book id.
        #[arg(long)]
        start_id: u32,

        /// Last book id (inclusive).
        #[arg(long)]
        end_id: u32,
    },

    /// Download every book listed in the catalog section.
    Category {
        /// First catalog page (1-based).
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        start_page: u32,

        /// Last catalog page; the catalog's own last page wins if larger.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        end_page: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let console = Console::new();

    console.section("Bookcrawl - Book Catalog Downloader");

    console.step("Loading configuration...");
    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;
    apply_overrides(&mut config, &args);
    config.validate().context("Invalid configuration")?;
    console.success("Configuration loaded");

    make_download_folders(&config)?;

    let fetcher = PageFetcher::new(&config.network).context("Failed to create HTTP client")?;

    let producer: Box<dyn SourceProducer> = match args.command {
        Command::Ids { start_id, end_id } => {
            if start_id > end_id {
                anyhow::bail!(
                    "Start id ({}) cannot be greater than end id ({})",
                    start_id,
                    end_id
                );
            }
            console.info(&format!("Processing book ids {} to {}", start_id, end_id));
            Box::new(IdRange::new(start_id, end_id))
        }
        Command::Category {
            start_page,
            end_page,
        } => {
            let start_url = config.site.category_url()?;
            console.info(&format!("Crawling catalog {}", start_url));
            Box::new(CategoryCrawler::new(
                fetcher.clone(),
                console.clone(),
                start_url,
                start_page,
                end_page,
                config.network.page_cooldown(),
            ))
        }
    };

    let options = RunOptions {
        skip_text: args.skip_txt,
        skip_images: args.skip_imgs,
    };

    let sources = producer
        .sources()
        .await
        .context("Failed to start book discovery")?;

    let mut orchestrator = DownloadOrchestrator::new(&config, fetcher, console.clone())?;
    let snapshot = orchestrator.run(sources, options).await;

    let description_path = config.paths.description_path();
    match DescriptionStore::existing(&description_path) {
        Ok(Some(previous)) => console.info(&format!(
            "Replacing {} descriptions from a previous run",
            console.count(previous.len())
        )),
        Ok(None) => {}
        Err(err) => console.warning(&format!(
            "Existing {} is unreadable and will be replaced: {}",
            description_path.display(),
            err
        )),
    }
    DescriptionStore::persist(&snapshot, &description_path).with_context(|| {
        format!(
            "Failed to write description file {}",
            description_path.display()
        )
    })?;

    let summary = orchestrator.summary();
    console.success(&format!(
        "{} books described, {} texts, {} images saved, {} skipped",
        console.count(summary.books),
        console.count(summary.texts),
        console.count(summary.images),
        summary.skipped
    ));
    console.info(&format!("Descriptions written to {}", description_path.display()));

    console.section("Done!");
    Ok(())
}

/// Command line flags win over the config file.
fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(dest) = &args.dest_folder {
        config.paths.dest_folder = dest.clone();
    }
    if let Some(json_path) = &args.json_path {
        config.paths.description_file = json_path.clone();
    }
}

/// Creates the text and image folders the downloader writes into.
fn make_download_folders(config: &Config) -> Result<()> {
    for dir in [config.paths.books_path(), config.paths.images_path()] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    Ok(())
}
