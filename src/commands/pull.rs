use colored::Colorize;
use tabled::Tabled;
use tracing::info;

use crate::artifact;
use crate::cli::PullArgs;
use crate::client::AdoClient;
use crate::error::Result;
use crate::output::{self, format_date, state_colored, truncate};
use crate::query;
use crate::reader::{self, Hierarchy};
use crate::types::WorkItemRecord;

#[derive(Tabled)]
pub(crate) struct ItemRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Type")]
    item_type: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Parent")]
    parent: String,
    #[tabled(rename = "Changed")]
    changed: String,
}

impl From<&WorkItemRecord> for ItemRow {
    fn from(record: &WorkItemRecord) -> Self {
        Self {
            id: record.id,
            item_type: record
                .item_type()
                .map(|t| t.colored())
                .unwrap_or_else(|| record.type_name.clone()),
            title: truncate(&record.title, 60),
            state: state_colored(&record.state),
            parent: record
                .parent
                .map(|p| format!("#{p}"))
                .unwrap_or_else(|| "-".to_string()),
            changed: format_date(record.changed_at),
        }
    }
}

pub async fn run(client: &AdoClient, args: PullArgs) -> Result<()> {
    if let Some(tag) = &args.tag {
        info!("Fetching stories tagged '{tag}'...");
        let stories = query::all_stories(client, Some(tag.as_str())).await?;
        info!("Found {} stories", stories.len());

        if let Some(path) = &args.output {
            artifact::write(path, &stories)?;
            info!("Wrote {}", path.display());
        }
        output::print_table(&stories, |s| ItemRow::from(s));
        return Ok(());
    }

    info!("Fetching epics, features and stories...");
    let hierarchy = reader::classify(query::all_work_items(client).await?);
    info!(
        "Found {} epics, {} features, {} stories",
        hierarchy.epics.len(),
        hierarchy.features.len(),
        hierarchy.stories.len()
    );

    if let Some(path) = &args.output {
        artifact::write(path, &hierarchy)?;
        info!("Wrote {}", path.display());
    }

    output::print_item(&hierarchy, print_tree);
    Ok(())
}

fn print_line(depth: usize, record: &WorkItemRecord) {
    let label = record
        .item_type()
        .map(|t| t.colored())
        .unwrap_or_else(|| record.type_name.clone());
    println!(
        "{}{} {} {} [{}]",
        "  ".repeat(depth),
        label,
        format!("#{}", record.id).dimmed(),
        record.title,
        state_colored(&record.state)
    );
}

fn print_tree(hierarchy: &Hierarchy) {
    for epic in &hierarchy.epics {
        print_line(0, epic);
        for feature in hierarchy.children_of(epic.id) {
            print_line(1, feature);
            for story in hierarchy.children_of(feature.id) {
                print_line(2, story);
            }
        }
    }

    let orphans = hierarchy.orphans();
    if !orphans.is_empty() {
        println!();
        println!("{}", "Not linked under a fetched parent:".yellow());
        for record in orphans {
            print_line(1, record);
        }
    }
}
