use std::path::PathBuf;

use serde::Serialize;
use tabled::Tabled;

use crate::config::Config;
use crate::error::Result;
use crate::mapping::{self, Mapping, MAPPING_FILE};
use crate::output;

#[derive(Serialize)]
struct MappingEntry {
    level: &'static str,
    key: String,
    ado_id: Option<u64>,
    parent: String,
}

#[derive(Tabled)]
struct MappingRow {
    #[tabled(rename = "Level")]
    level: &'static str,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "ADO ID")]
    ado_id: String,
    #[tabled(rename = "Under")]
    parent: String,
}

impl From<&MappingEntry> for MappingRow {
    fn from(entry: &MappingEntry) -> Self {
        Self {
            level: entry.level,
            key: output::truncate(&entry.key, 50),
            ado_id: entry
                .ado_id
                .map(|id| format!("#{id}"))
                .unwrap_or_else(|| "-".to_string()),
            parent: entry.parent.clone(),
        }
    }
}

/// One row per mapped item, epics first.
fn entries(mapping: &Mapping) -> Vec<MappingEntry> {
    let epics = mapping.epics.iter().map(|(key, id)| MappingEntry {
        level: "Epic",
        key: key.to_string(),
        ado_id: id,
        parent: String::new(),
    });
    let features = mapping.features.iter().map(|(key, id)| MappingEntry {
        level: "Feature",
        key: key.to_string(),
        ado_id: id,
        parent: String::new(),
    });
    let stories = mapping.stories.iter().map(|story| MappingEntry {
        level: "Story",
        key: story.title.clone(),
        ado_id: story.ado_id,
        parent: format!("{} / {}", story.epic, story.feature),
    });
    epics.chain(features).chain(stories).collect()
}

pub fn show(config: &Config, file: Option<PathBuf>) -> Result<()> {
    let path = file.unwrap_or_else(|| config.output_dir().join(MAPPING_FILE));

    let Some(mapping) = mapping::load(&path) else {
        output::print_message(&format!("No mapping at {}", path.display()));
        return Ok(());
    };

    output::print_item(&mapping, |m| {
        output::print_table(&entries(m), |e| MappingRow::from(e));
        if m.is_placeholder_only() {
            println!("Nothing in this mapping exists in ADO");
        }
    });
    Ok(())
}
