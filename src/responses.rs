//! Shared ADO response types used across the query and item modules.

use serde::{Deserialize, Serialize};

use crate::types::WorkItemRef;

/// Flat WIQL result (`FROM WorkItems`).
#[derive(Deserialize)]
pub struct WiqlResponse {
    #[serde(rename = "workItems", default)]
    pub work_items: Vec<WorkItemRef>,
}

/// Link WIQL result (`FROM WorkItemLinks`).
#[derive(Deserialize)]
pub struct WiqlLinkResponse {
    #[serde(rename = "workItemRelations", default)]
    pub work_item_relations: Vec<WorkItemLink>,
}

#[derive(Deserialize)]
pub struct WorkItemLink {
    #[serde(default)]
    pub target: Option<WorkItemRef>,
}

/// `{ "count": n, "value": [...] }` list envelope.
#[derive(Deserialize)]
pub struct ValueList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// Project info, used to check connectivity.
#[derive(Deserialize, Serialize, Debug)]
pub struct ProjectInfo {
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

/// Minimal item info returned after create/update.
#[derive(Deserialize, Debug)]
pub struct CreatedItem {
    pub id: u64,
}
