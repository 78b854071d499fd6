use crate::cli::AttachArgs;
use crate::client::AdoClient;
use crate::error::Result;
use crate::items;
use crate::output;

pub async fn run(client: &AdoClient, args: AttachArgs) -> Result<()> {
    let id = items::attach_file(
        client,
        args.id,
        &args.file,
        args.name.as_deref(),
        args.comment.as_deref(),
    )
    .await?;

    output::print_message(&format!("Attached {} to #{id}", args.file.display()));
    Ok(())
}
