use colored::Colorize;
use tracing::{info, warn};

use crate::breakdown;
use crate::cli::PushArgs;
use crate::client::AdoClient;
use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::mapping::{self, MAPPING_FILE, PARTIAL_MAPPING_FILE};
use crate::output::{self, format_days};
use crate::writer::{HierarchyWriter, PushReport, PushTarget};

pub async fn run(config: &Config, args: PushArgs) -> Result<()> {
    let output_dir = config.output_dir();
    let (tree, source) = breakdown::load(args.file.as_deref(), &output_dir)?;
    info!(
        "Source: {} ({} days estimated)",
        source.display(),
        format_days(tree.total_days())
    );

    // A dry run never talks to ADO, so credentials are optional there.
    let client = if args.dry_run {
        info!("[DRY RUN] No changes will be made to ADO");
        None
    } else {
        Some(AdoClient::new(config.credentials()?))
    };

    let ado_project = match &client {
        Some(client) => Some(client.credentials().project.clone()),
        None => config.credentials().ok().map(|c| c.project.clone()),
    };
    let project_name = config
        .project_name(args.project_name.as_deref(), ado_project.as_deref())
        .ok_or_else(|| SyncError::MissingCredentials {
            missing: vec!["project"],
        })?;

    if client.is_some() && !args.yes {
        let question = format!(
            "Create {} epics, {} features, {} stories in '{}'?",
            tree.epics.len(),
            tree.feature_count(),
            tree.story_count(),
            project_name
        );
        if !super::confirm(&question)? {
            output::print_message("Aborted.");
            return Ok(());
        }
    }

    let writer = HierarchyWriter::new(project_name).with_marker_tag(args.marker_tag);
    let target = match &client {
        Some(client) => PushTarget::Live(client),
        None => PushTarget::DryRun,
    };

    match writer.push(&tree, target).await {
        Ok(report) => {
            if !report.dry_run {
                let path = output_dir.join(MAPPING_FILE);
                mapping::persist(&report.mapping, &path)?;
                info!("Mapping written to {}", path.display());
            }
            output::print_item(&report, print_summary);
            Ok(())
        }
        Err(SyncError::Aborted {
            item,
            mapping,
            source,
        }) => {
            if args.keep_partial {
                let path = output_dir.join(PARTIAL_MAPPING_FILE);
                mapping::persist(&mapping, &path)?;
                warn!("Partial mapping written to {}", path.display());
            } else if !mapping.is_placeholder_only() {
                warn!(
                    "{} item(s) were created before the failure; rerun with --keep-partial to record them",
                    mapping.created_count()
                );
            }
            Err(SyncError::Aborted {
                item,
                mapping,
                source,
            })
        }
        Err(e) => Err(e),
    }
}

fn print_summary(report: &PushReport) {
    if output::is_quiet() {
        return;
    }

    let heading = if report.dry_run {
        "Dry run complete".yellow().bold()
    } else {
        "Push complete".green().bold()
    };
    println!("{heading}");
    println!("  Epics:    {}", report.epics);
    println!("  Features: {}", report.features);
    println!("  Stories:  {}", report.stories);
    if !report.dry_run {
        println!("  Tasks:    {}", report.tasks_created);
        if report.tasks_failed > 0 {
            println!("  {}", format!("Failed tasks: {}", report.tasks_failed).red());
        }
    }
    println!("  Effort:   {} days", format_days(report.total_effort));
}
