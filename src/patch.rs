//! JSON-patch documents for work item create/update calls.

use serde::Serialize;
use serde_json::{json, Value};

use crate::types::{fields, RelationKind};

/// Field a patch operation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    Title,
    Description,
    Tags,
    State,
    Effort,
    AcceptanceCriteria,
    /// Any other field by reference name, e.g. `Custom.Risk`
    Custom(String),
}

impl FieldPath {
    pub fn reference_name(&self) -> &str {
        match self {
            FieldPath::Title => fields::TITLE,
            FieldPath::Description => fields::DESCRIPTION,
            FieldPath::Tags => fields::TAGS,
            FieldPath::State => fields::STATE,
            FieldPath::Effort => fields::EFFORT,
            FieldPath::AcceptanceCriteria => fields::ACCEPTANCE_CRITERIA,
            FieldPath::Custom(name) => name.trim_start_matches("/fields/"),
        }
    }

    fn pointer(&self) -> String {
        format!("/fields/{}", self.reference_name())
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PatchOperation {
    pub op: &'static str,
    pub path: String,
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchDocument {
    operations: Vec<PatchOperation>,
}

impl PatchDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(mut self, path: FieldPath, value: impl Into<Value>) -> Self {
        self.operations.push(PatchOperation {
            op: "add",
            path: path.pointer(),
            value: value.into(),
        });
        self
    }

    /// Adds the field only when `value` is non-empty.
    pub fn add_text(self, path: FieldPath, value: &str) -> Self {
        if value.is_empty() {
            self
        } else {
            self.add_field(path, value)
        }
    }

    /// Parent link; ADO expresses it as a reverse-hierarchy relation.
    pub fn add_parent(self, org_url: &str, parent_id: u64) -> Self {
        self.add_relation(
            RelationKind::Parent,
            format!("{org_url}/_apis/wit/workItems/{parent_id}"),
            None,
        )
    }

    pub fn add_attachment(self, attachment_url: &str, comment: &str) -> Self {
        self.add_relation(
            RelationKind::AttachedFile,
            attachment_url.to_string(),
            Some(json!({ "comment": comment })),
        )
    }

    fn add_relation(mut self, kind: RelationKind, url: String, attributes: Option<Value>) -> Self {
        let mut value = json!({ "rel": kind.rel_name(), "url": url });
        if let Some(attributes) = attributes {
            value["attributes"] = attributes;
        }
        self.operations.push(PatchOperation {
            op: "add",
            path: "/relations/-".to_string(),
            value,
        });
        self
    }

    pub fn operations(&self) -> &[PatchOperation] {
        &self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn to_json(&self) -> Value {
        json!(self.operations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_field_and_relation_operations() {
        let doc = PatchDocument::new()
            .add_field(FieldPath::Title, "Login")
            .add_text(FieldPath::Description, "")
            .add_field(FieldPath::Effort, 3.0)
            .add_parent("https://dev.azure.com/contoso", 17);

        assert_eq!(
            doc.to_json(),
            json!([
                { "op": "add", "path": "/fields/System.Title", "value": "Login" },
                { "op": "add", "path": "/fields/Microsoft.VSTS.Scheduling.Effort", "value": 3.0 },
                {
                    "op": "add",
                    "path": "/relations/-",
                    "value": {
                        "rel": "System.LinkTypes.Hierarchy-Reverse",
                        "url": "https://dev.azure.com/contoso/_apis/wit/workItems/17"
                    }
                }
            ])
        );
    }

    #[test]
    fn test_custom_path_accepts_prefixed_names() {
        let doc = PatchDocument::new()
            .add_field(FieldPath::Custom("/fields/Custom.Risk".into()), "high")
            .add_field(FieldPath::Custom("Custom.Owner".into()), "ana");
        assert_eq!(doc.operations()[0].path, "/fields/Custom.Risk");
        assert_eq!(doc.operations()[1].path, "/fields/Custom.Owner");
    }

    #[test]
    fn test_attachment_relation_carries_comment() {
        let doc = PatchDocument::new().add_attachment("https://files/1", "shot.png");
        assert_eq!(doc.operations()[0].value["rel"], "AttachedFile");
        assert_eq!(doc.operations()[0].value["attributes"]["comment"], "shot.png");
    }
}
