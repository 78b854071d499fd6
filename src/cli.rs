use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "ado-sync")]
#[command(about = "Push work breakdowns into Azure DevOps and pull them back out", version)]
#[command(after_help = "EXAMPLES:
    ado-sync push --dry-run            Preview what would be created
    ado-sync push --yes                Create epics, features, stories and tasks
    ado-sync pull --output tree.json   Save the remote hierarchy
    ado-sync children 1234             List the children of an item
    ado-sync validate --figma-link <url>  Build a validation bundle")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress success messages
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Debug logging and full error chains
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Config file (default: ./ado-sync.toml, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the local breakdown in ADO
    #[command(after_help = "EXAMPLES:
    ado-sync push --dry-run
    ado-sync push --file output/push_ready.json --yes
    ado-sync push --keep-partial --marker-tag estimate")]
    Push(PushArgs),
    /// Read epics, features and stories back from ADO
    #[command(after_help = "EXAMPLES:
    ado-sync pull
    ado-sync pull --tag presales --output stories.json
    ado-sync pull --json")]
    Pull(PullArgs),
    /// List the direct children of a work item
    #[command(after_help = "EXAMPLES:
    ado-sync children 1234")]
    Children {
        /// Parent work item id
        id: u64,
    },
    /// Verify credentials and project access
    #[command(after_help = "EXAMPLES:
    ado-sync check")]
    Check,
    /// Update fields on an existing work item
    #[command(after_help = "EXAMPLES:
    ado-sync update 1234 --state Active
    ado-sync update 1234 --acceptance-criteria \"<ol><li>Works</li></ol>\"
    ado-sync update 1234 --field Custom.Team=Payments")]
    Update(UpdateArgs),
    /// Upload a file and attach it to a work item
    #[command(after_help = "EXAMPLES:
    ado-sync attach 1234 ./login.png
    ado-sync attach 1234 ./spec.pdf --comment \"Signed-off spec\"")]
    Attach(AttachArgs),
    /// Bundle design screenshots with every ADO story for review
    #[command(after_help = "EXAMPLES:
    ado-sync validate --figma-link https://www.figma.com/design/ABC123/Shop")]
    Validate(ValidateArgs),
    /// Bundle design screenshots with selected ADO stories for criteria work
    #[command(after_help = "EXAMPLES:
    ado-sync enrich --figma-link https://www.figma.com/design/ABC123/Shop
    ado-sync enrich --figma-link <url> --story-ids 101,102 --fresh")]
    Enrich(EnrichArgs),
    /// Show the mapping written by the last push
    #[command(after_help = "EXAMPLES:
    ado-sync mapping
    ado-sync mapping --file output/ado_mapping.partial.json")]
    Mapping {
        /// Mapping file (default: <output_dir>/ado_mapping.json)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Generate shell completions
    #[command(after_help = "EXAMPLES:
    ado-sync completions bash > ~/.bash_completion.d/ado-sync
    ado-sync completions zsh > ~/.zfunc/_ado-sync
    ado-sync completions fish > ~/.config/fish/completions/ado-sync.fish")]
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
    /// Initialize configuration file interactively
    #[command(after_help = "EXAMPLES:
    ado-sync init")]
    Init,
}

#[derive(Args)]
pub struct PushArgs {
    /// Breakdown file (default: push_ready.json, then breakdown.json in the output dir)
    #[arg(long, short)]
    pub file: Option<PathBuf>,

    /// Show what would be created without calling ADO
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(long, short)]
    pub yes: bool,

    /// On a fatal error, write what was created to ado_mapping.partial.json
    #[arg(long)]
    pub keep_partial: bool,

    /// Project name used in tags (default: `name` from config, then the ADO project)
    #[arg(long)]
    pub project_name: Option<String>,

    /// Tag marking every created item
    #[arg(long, default_value = crate::writer::MARKER_TAG)]
    pub marker_tag: String,
}

#[derive(Args)]
pub struct PullArgs {
    /// Only stories carrying this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Also write the result as JSON to this file
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Work item id
    pub id: u64,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// New description (HTML)
    #[arg(long)]
    pub description: Option<String>,

    /// New state
    #[arg(long)]
    pub state: Option<String>,

    /// New acceptance criteria (HTML)
    #[arg(long)]
    pub acceptance_criteria: Option<String>,

    /// New effort in days
    #[arg(long)]
    pub effort: Option<f64>,

    /// Set any field by reference name (repeatable)
    #[arg(long = "field", value_name = "NAME=VALUE", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,
}

#[derive(Args)]
pub struct AttachArgs {
    /// Work item id
    pub id: u64,

    /// Path to file to upload
    pub file: PathBuf,

    /// Attachment name (defaults to the file name)
    #[arg(long, short)]
    pub name: Option<String>,

    /// Relation comment (defaults to the attachment name)
    #[arg(long, short)]
    pub comment: Option<String>,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Figma design link
    #[arg(long)]
    pub figma_link: String,
}

#[derive(Args)]
pub struct EnrichArgs {
    /// Figma design link
    #[arg(long)]
    pub figma_link: String,

    /// Only these ADO story ids (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub story_ids: Vec<String>,

    /// Download screenshots even if some are already on disk
    #[arg(long)]
    pub fresh: bool,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(name, _)| !name.trim().is_empty())
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))
}
