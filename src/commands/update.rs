use crate::cli::UpdateArgs;
use crate::client::AdoClient;
use crate::error::Result;
use crate::items;
use crate::output;
use crate::patch::{FieldPath, PatchDocument};

/// Patch with one operation per flag given.
fn build_patch(args: &UpdateArgs) -> PatchDocument {
    let mut patch = PatchDocument::new();

    if let Some(title) = &args.title {
        patch = patch.add_text(FieldPath::Title, title);
    }
    if let Some(description) = &args.description {
        patch = patch.add_field(FieldPath::Description, description.as_str());
    }
    if let Some(state) = &args.state {
        patch = patch.add_field(FieldPath::State, state.as_str());
    }
    if let Some(criteria) = &args.acceptance_criteria {
        patch = patch.add_field(FieldPath::AcceptanceCriteria, criteria.as_str());
    }
    if let Some(effort) = args.effort {
        patch = patch.add_field(FieldPath::Effort, effort);
    }
    for (name, value) in &args.fields {
        patch = patch.add_field(FieldPath::Custom(name.clone()), value.as_str());
    }

    patch
}

pub async fn run(client: &AdoClient, args: UpdateArgs) -> Result<()> {
    let patch = build_patch(&args);

    if patch.is_empty() {
        println!("No updates specified");
        return Ok(());
    }

    let id = items::update(client, args.id, &patch).await?;
    output::print_message(&format!("Updated #{id} ({} field(s))", patch.operations().len()));
    Ok(())
}
