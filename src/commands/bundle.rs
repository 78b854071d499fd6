//! `validate` and `enrich`: design screenshots plus ADO stories, written as
//! one bundle for downstream analysis.

use std::path::{Path, PathBuf};

use colored::Colorize;
use serde::Serialize;
use tracing::{info, warn};

use crate::artifact;
use crate::cli::{EnrichArgs, ValidateArgs};
use crate::client::AdoClient;
use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::figma::{self, FigmaClient};
use crate::output;
use crate::query;
use crate::reader::{self, Bundle, StorySelection, ENRICHMENT_BUNDLE_FILE, VALIDATION_BUNDLE_FILE};
use crate::types::WorkItemRecord;

const SCREENSHOTS_DIR: &str = "screenshots";

#[derive(Serialize)]
struct BundleSummary {
    bundle: PathBuf,
    figma_file_key: String,
    screens: usize,
    stories: usize,
}

fn figma_setup(config: &Config, link: &str) -> Result<(FigmaClient, String)> {
    let token = config.figma_pat()?;
    let file_key =
        figma::extract_file_key(link).ok_or_else(|| SyncError::InvalidFigmaLink(link.to_string()))?;
    Ok((FigmaClient::new(token), file_key))
}

async fn fetch_stories(client: &AdoClient) -> Result<Vec<WorkItemRecord>> {
    info!("Fetching stories from ADO...");
    let hierarchy = reader::classify(query::all_work_items(client).await?);
    Ok(hierarchy.stories)
}

fn write_bundle(bundle: &Bundle, path: &Path) -> Result<()> {
    artifact::write(path, bundle)?;

    let summary = BundleSummary {
        bundle: path.to_path_buf(),
        figma_file_key: bundle.figma_file_key.clone(),
        screens: bundle.screens.len(),
        stories: bundle.stories.len(),
    };
    output::print_item(&summary, |s| {
        if output::is_quiet() {
            return;
        }
        println!("{}", "Bundle ready".green().bold());
        println!("  Bundle:  {}", s.bundle.display());
        println!("  Screens: {}", s.screens);
        println!("  Stories: {}", s.stories);
    });
    Ok(())
}

/// Fresh screenshots of every frame plus every story in the project.
pub async fn validate(client: &AdoClient, config: &Config, args: ValidateArgs) -> Result<()> {
    let (figma, file_key) = figma_setup(config, &args.figma_link)?;
    let output_dir = config.output_dir();

    let screens = figma
        .fetch_screenshots(&file_key, &output_dir.join(SCREENSHOTS_DIR))
        .await?;

    let stories = fetch_stories(client).await?;
    if stories.is_empty() {
        warn!("No stories found in ADO");
    } else {
        info!("Found {} stories", stories.len());
    }

    let bundle = Bundle::new(&file_key, screens, &stories);
    write_bundle(&bundle, &output_dir.join(VALIDATION_BUNDLE_FILE))
}

/// Screenshots (reused when present) plus all or selected stories.
pub async fn enrich(client: &AdoClient, config: &Config, args: EnrichArgs) -> Result<()> {
    let (figma, file_key) = figma_setup(config, &args.figma_link)?;
    let output_dir = config.output_dir();

    if args.story_ids.is_empty() {
        info!("Mode: FULL (all stories)");
    } else {
        info!("Mode: TARGETED ({})", args.story_ids.join(", "));
    }

    let screens = figma
        .screenshots(&file_key, &output_dir.join(SCREENSHOTS_DIR), !args.fresh)
        .await?;

    let selection = reader::select_stories(fetch_stories(client).await?, Some(args.story_ids.as_slice()));
    match &selection {
        StorySelection::All(stories) => info!("Found {} stories", stories.len()),
        StorySelection::Matched { stories, requested } => {
            info!("Found {} of {} requested stories", stories.len(), requested)
        }
        StorySelection::NoMatch { available } => warn!(
            "None of the specified story IDs found in ADO ({available} stories available)"
        ),
        StorySelection::Empty => warn!("No stories found in ADO"),
    }

    let bundle = Bundle::new(&file_key, screens, selection.stories());
    write_bundle(&bundle, &output_dir.join(ENRICHMENT_BUNDLE_FILE))
}
