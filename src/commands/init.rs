use std::path::Path;

use crate::config::{AdoSection, Config, FigmaSection};
use crate::error::{Result, SyncError};

fn optional(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

pub async fn run(explicit: Option<&Path>) -> Result<()> {
    let config_path = match explicit {
        Some(path) => path.to_path_buf(),
        None => Config::config_path()?,
    };

    if config_path.exists() {
        let answer = super::prompt(&format!(
            "Config file already exists at {}. Overwrite? [y/N] ",
            config_path.display()
        ))?;
        if !answer.eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    println!("ado-sync Configuration");
    println!("======================\n");

    let organization = super::prompt("ADO organization (dev.azure.com/<organization>): ")?;
    let project = super::prompt("ADO project: ")?;
    let pat = super::prompt(
        "Personal access token (Work Items read & write, create one under User settings > Personal access tokens): ",
    )?;

    let mut missing = Vec::new();
    if organization.is_empty() {
        missing.push("organization");
    }
    if project.is_empty() {
        missing.push("project");
    }
    if pat.is_empty() {
        missing.push("pat");
    }
    if !missing.is_empty() {
        return Err(SyncError::MissingCredentials { missing });
    }

    let name = super::prompt("Project name used in tags [optional, defaults to the ADO project]: ")?;
    let figma_pat = super::prompt("Figma personal access token [optional]: ")?;

    let config = Config {
        name: optional(name),
        output_dir: None,
        ado: AdoSection {
            organization: Some(organization),
            project: Some(project),
            pat: Some(pat),
        },
        figma: FigmaSection {
            pat: optional(figma_pat),
        },
    };

    config.save(&config_path)?;

    println!("\nConfig saved to {}", config_path.display());
    println!("You can now run 'ado-sync check'.");

    Ok(())
}
