use colored::Colorize;

use crate::client::AdoClient;
use crate::error::Result;
use crate::items;
use crate::output;

pub async fn run(client: &AdoClient) -> Result<()> {
    let project = items::test_connection(client).await?;
    let organization = &client.credentials().organization;

    output::print_item(&project, |p| {
        if output::is_quiet() {
            return;
        }
        println!("{} {}/{}", "Connected".green().bold(), organization, p.name);
        if let Some(id) = &p.id {
            println!("Project id: {}", id.dimmed());
        }
    });
    Ok(())
}
