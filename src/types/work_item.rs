use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ItemRelation, RelationKind, WorkItemType};

/// ADO field reference names used by the engine.
pub mod fields {
    pub const TITLE: &str = "System.Title";
    pub const DESCRIPTION: &str = "System.Description";
    pub const TAGS: &str = "System.Tags";
    pub const STATE: &str = "System.State";
    pub const WORK_ITEM_TYPE: &str = "System.WorkItemType";
    pub const PARENT: &str = "System.Parent";
    pub const CHANGED_DATE: &str = "System.ChangedDate";
    pub const EFFORT: &str = "Microsoft.VSTS.Scheduling.Effort";
    pub const ACCEPTANCE_CRITERIA: &str = "Microsoft.VSTS.Common.AcceptanceCriteria";
}

/// Lightweight reference returned by a WIQL query.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct WorkItemRef {
    pub id: u64,
    #[serde(default)]
    pub url: Option<String>,
}

/// Work item exactly as the batch endpoint returns it.
#[derive(Deserialize, Debug, Clone)]
pub struct AdoWorkItem {
    pub id: u64,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub relations: Vec<ItemRelation>,
}

/// Read-only snapshot of a remote work item.
#[derive(Serialize, Debug, Clone)]
pub struct WorkItemRecord {
    pub id: u64,
    #[serde(rename = "type")]
    pub type_name: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceptance_criteria: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub fields: Map<String, Value>,
}

impl WorkItemRecord {
    pub fn item_type(&self) -> Option<WorkItemType> {
        WorkItemType::from_wire(&self.type_name)
    }

    /// Text of a raw field, looking inside a nested `fields` object too.
    pub fn raw_text(&self, path: &str) -> Option<&str> {
        self.fields
            .get(path)
            .or_else(|| self.fields.get("fields").and_then(|nested| nested.get(path)))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Tags joined the way ADO stores them.
    pub fn tags_joined(&self) -> String {
        self.tags.join("; ")
    }
}

impl From<AdoWorkItem> for WorkItemRecord {
    fn from(item: AdoWorkItem) -> Self {
        let text = |name: &str| {
            item.fields
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let parent = item
            .fields
            .get(fields::PARENT)
            .and_then(Value::as_u64)
            .or_else(|| {
                item.relations
                    .iter()
                    .find(|r| r.kind() == Some(RelationKind::Parent))
                    .and_then(ItemRelation::target_id)
            });

        let changed_at = item
            .fields
            .get(fields::CHANGED_DATE)
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<DateTime<Utc>>().ok());

        Self {
            id: item.id,
            type_name: text(fields::WORK_ITEM_TYPE),
            title: text(fields::TITLE),
            description: text(fields::DESCRIPTION),
            tags: split_tags(&text(fields::TAGS)),
            state: text(fields::STATE),
            effort: item.fields.get(fields::EFFORT).and_then(Value::as_f64),
            acceptance_criteria: Some(text(fields::ACCEPTANCE_CRITERIA)).filter(|s| !s.is_empty()),
            parent,
            changed_at,
            fields: item.fields,
        }
    }
}

/// Split ADO's `a; b; c` tag string, dropping blanks.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn wire(value: Value) -> WorkItemRecord {
        serde_json::from_value::<AdoWorkItem>(value).unwrap().into()
    }

    #[test]
    fn test_record_from_wire_item() {
        let record = wire(json!({
            "id": 12,
            "fields": {
                "System.WorkItemType": "User Story",
                "System.Title": "Login",
                "System.Tags": "presales; shop;  ",
                "System.State": "New",
                "System.Parent": 7,
                "System.ChangedDate": "2025-03-01T10:00:00Z",
                "Microsoft.VSTS.Scheduling.Effort": 4.5,
                "Microsoft.VSTS.Common.AcceptanceCriteria": "<p>works</p>"
            }
        }));

        assert_eq!(record.item_type(), Some(WorkItemType::UserStory));
        assert_eq!(record.tags, vec!["presales", "shop"]);
        assert_eq!(record.parent, Some(7));
        assert_eq!(record.effort, Some(4.5));
        assert_eq!(record.acceptance_criteria.as_deref(), Some("<p>works</p>"));
        assert!(record.changed_at.is_some());
        assert_eq!(record.description, "");
    }

    #[test]
    fn test_parent_falls_back_to_relation() {
        let record = wire(json!({
            "id": 3,
            "fields": { "System.WorkItemType": "Feature" },
            "relations": [{
                "rel": "System.LinkTypes.Hierarchy-Reverse",
                "url": "https://dev.azure.com/contoso/_apis/wit/workItems/1"
            }]
        }));
        assert_eq!(record.parent, Some(1));
    }

    #[test]
    fn test_raw_text_reads_nested_fields() {
        let record = wire(json!({
            "id": 5,
            "fields": {
                "fields": { "Microsoft.VSTS.Common.AcceptanceCriteria": "nested" }
            }
        }));
        assert_eq!(record.acceptance_criteria, None);
        assert_eq!(record.raw_text(fields::ACCEPTANCE_CRITERIA), Some("nested"));
    }
}
