//! WIQL queries and batched detail fetches.
//!
//! A query only returns ids; the fields come from a second call against the
//! batch endpoint, which accepts at most [`DETAIL_BATCH_SIZE`] ids.

use std::collections::HashMap;

use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use crate::backend::RequestBody;
use crate::client::AdoClient;
use crate::error::Result;
use crate::responses::{ValueList, WiqlLinkResponse, WiqlResponse};
use crate::types::{AdoWorkItem, RelationKind, WorkItemRecord, WorkItemRef};

/// Hard limit of the ADO batch endpoint.
pub const DETAIL_BATCH_SIZE: usize = 200;

/// All user stories, optionally restricted to those carrying `tag`.
pub fn stories_query(tag: Option<&str>) -> String {
    let mut wiql = String::from(
        "SELECT [System.Id], [System.Title], [System.Description], \
         [System.Tags], [System.State] \
         FROM WorkItems WHERE [System.WorkItemType] = 'User Story'",
    );
    if let Some(tag) = tag {
        wiql.push_str(&format!(" AND [System.Tags] CONTAINS {}", quote(tag)));
    }
    wiql.push_str(" ORDER BY [System.Id] ASC");
    wiql
}

/// Epics, features and stories ordered by type then id.
pub fn hierarchy_query() -> String {
    "SELECT [System.Id], [System.Title], [System.WorkItemType], \
     [System.Description], [System.Tags], [System.State] \
     FROM WorkItems WHERE [System.WorkItemType] IN ('Epic', 'Feature', 'User Story') \
     ORDER BY [System.WorkItemType] ASC, [System.Id] ASC"
        .to_string()
}

/// Direct children of `parent_id` through hierarchy links.
pub fn children_query(parent_id: u64) -> String {
    format!(
        "SELECT [System.Id], [System.Title], [System.WorkItemType] \
         FROM WorkItemLinks \
         WHERE ([Source].[System.Id] = {parent_id}) \
         AND ([System.Links.LinkType] = '{}') \
         MODE (MustContain)",
        RelationKind::Child.rel_name()
    )
}

/// WIQL string literal.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Submit a WIQL query and return the matching item references.
pub async fn run_query(client: &AdoClient, wiql: &str) -> Result<Vec<WorkItemRef>> {
    let url = client.api_url("wit/wiql", None);
    let response: WiqlResponse = client
        .execute_as(Method::POST, &url, Some(RequestBody::json(json!({ "query": wiql }))))
        .await?;
    debug!(count = response.work_items.len(), "WIQL query returned");
    Ok(response.work_items)
}

/// Fetch full records for `ids`, 200 per call, in the order given.
pub async fn fetch_details(client: &AdoClient, ids: &[u64]) -> Result<Vec<WorkItemRecord>> {
    let mut records = Vec::with_capacity(ids.len());

    for (batch_index, batch) in ids.chunks(DETAIL_BATCH_SIZE).enumerate() {
        let id_list = batch
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let url = client.api_url(
            "wit/workitems",
            Some(&format!("ids={id_list}&$expand=relations&errorPolicy=omit")),
        );
        debug!(batch = batch_index + 1, size = batch.len(), "Fetching work item details");

        let response: ValueList<Option<AdoWorkItem>> =
            client.execute_as(Method::GET, &url, None).await?;

        let mut by_id: HashMap<u64, AdoWorkItem> = response
            .value
            .into_iter()
            .flatten()
            .map(|item| (item.id, item))
            .collect();

        records.extend(
            batch
                .iter()
                .filter_map(|id| by_id.remove(id))
                .map(WorkItemRecord::from),
        );
    }

    Ok(records)
}

/// Query plus detail fetch.
pub async fn query_items(client: &AdoClient, wiql: &str) -> Result<Vec<WorkItemRecord>> {
    let refs = run_query(client, wiql).await?;
    if refs.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<u64> = refs.iter().map(|r| r.id).collect();
    fetch_details(client, &ids).await
}

pub async fn all_stories(client: &AdoClient, tag: Option<&str>) -> Result<Vec<WorkItemRecord>> {
    query_items(client, &stories_query(tag)).await
}

pub async fn all_work_items(client: &AdoClient) -> Result<Vec<WorkItemRecord>> {
    let records = query_items(client, &hierarchy_query()).await?;
    info!("Fetched {} work items from ADO", records.len());
    Ok(records)
}

/// Children of `parent_id` (typically its tasks).
pub async fn child_items(client: &AdoClient, parent_id: u64) -> Result<Vec<WorkItemRecord>> {
    let url = client.api_url("wit/wiql", None);
    let wiql = children_query(parent_id);
    let response: WiqlLinkResponse = client
        .execute_as(Method::POST, &url, Some(RequestBody::json(json!({ "query": wiql }))))
        .await?;

    let mut child_ids: Vec<u64> = Vec::new();
    for link in response.work_item_relations {
        if let Some(target) = link.target {
            // the source item is listed as a target of a null-source row
            if target.id != parent_id && !child_ids.contains(&target.id) {
                child_ids.push(target.id);
            }
        }
    }

    if child_ids.is_empty() {
        return Ok(Vec::new());
    }
    fetch_details(client, &child_ids).await
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::client::tests::test_client;

    fn item(id: u64) -> Value {
        json!({ "id": id, "fields": { "System.WorkItemType": "User Story", "System.Title": format!("S{id}") } })
    }

    /// Answers each detail call with the ids it asked for, in reverse order.
    fn answer_batches(backend: &FakeBackend, ids: &[u64]) {
        for batch in ids.chunks(DETAIL_BATCH_SIZE) {
            let items: Vec<Value> = batch.iter().rev().map(|id| item(*id)).collect();
            backend.push_json(json!({ "count": items.len(), "value": items }));
        }
    }

    #[tokio::test]
    async fn test_fetch_details_batches_by_200() {
        for k in [1usize, 200, 201, 450] {
            let backend = FakeBackend::new();
            let ids: Vec<u64> = (1..=k as u64).collect();
            answer_batches(&backend, &ids);
            let client = test_client(&backend);

            let records = fetch_details(&client, &ids).await.unwrap();

            assert_eq!(backend.count(), k.div_ceil(DETAIL_BATCH_SIZE));
            assert_eq!(records.len(), k);
            let got: Vec<u64> = records.iter().map(|r| r.id).collect();
            assert_eq!(got, ids);
        }
    }

    #[tokio::test]
    async fn test_fetch_details_tolerates_missing_ids() {
        let backend = FakeBackend::new();
        backend.push_json(json!({ "count": 2, "value": [item(3), null, item(1)] }));
        let client = test_client(&backend);

        let records = fetch_details(&client, &[1, 2, 3]).await.unwrap();
        let got: Vec<u64> = records.iter().map(|r| r.id).collect();
        assert_eq!(got, vec![1, 3]);

        let url = &backend.recorded()[0].url;
        assert!(url.contains("ids=1,2,3"));
        assert!(url.contains("api-version=7.1"));
    }

    #[tokio::test]
    async fn test_empty_query_skips_detail_fetch() {
        let backend = FakeBackend::new();
        backend.push_json(json!({ "workItems": [] }));
        let client = test_client(&backend);

        let records = query_items(&client, &hierarchy_query()).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(backend.count(), 1);
    }

    #[tokio::test]
    async fn test_child_items_excludes_parent() {
        let backend = FakeBackend::new();
        backend
            .push_json(json!({
                "workItemRelations": [
                    { "source": null, "target": { "id": 10 } },
                    { "source": { "id": 10 }, "target": { "id": 11 } },
                    { "source": { "id": 10 }, "target": { "id": 12 } }
                ]
            }))
            .push_json(json!({ "value": [item(11), item(12)] }));
        let client = test_client(&backend);

        let children = child_items(&client, 10).await.unwrap();

        assert_eq!(children.iter().map(|c| c.id).collect::<Vec<_>>(), vec![11, 12]);
        let detail_url = &backend.recorded()[1].url;
        assert!(detail_url.contains("ids=11,12"));
    }

    #[test]
    fn test_stories_query_quotes_tag() {
        let wiql = stories_query(Some("O'Brien"));
        assert!(wiql.contains("CONTAINS 'O''Brien'"));
        assert!(wiql.ends_with("ORDER BY [System.Id] ASC"));
    }
}
