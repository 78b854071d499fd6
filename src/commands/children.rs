use crate::client::AdoClient;
use crate::error::Result;
use crate::output;
use crate::query;

use super::pull::ItemRow;

pub async fn list(client: &AdoClient, id: u64) -> Result<()> {
    let children = query::child_items(client, id).await?;

    if children.is_empty() && !output::is_json_output() {
        output::print_message(&format!("#{id} has no children"));
        return Ok(());
    }

    output::print_table(&children, |c| ItemRow::from(c));
    Ok(())
}
