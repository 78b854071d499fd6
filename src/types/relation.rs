use serde::{Deserialize, Serialize};

/// Relation types the engine reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Link from a child to its parent
    Parent,
    /// Link from a parent to one of its children
    Child,
    /// Uploaded file attached to the item
    AttachedFile,
}

impl RelationKind {
    pub fn rel_name(self) -> &'static str {
        match self {
            Self::Parent => "System.LinkTypes.Hierarchy-Reverse",
            Self::Child => "System.LinkTypes.Hierarchy-Forward",
            Self::AttachedFile => "AttachedFile",
        }
    }

    pub fn from_rel_name(rel: &str) -> Option<Self> {
        match rel {
            "System.LinkTypes.Hierarchy-Reverse" => Some(Self::Parent),
            "System.LinkTypes.Hierarchy-Forward" => Some(Self::Child),
            "AttachedFile" => Some(Self::AttachedFile),
            _ => None,
        }
    }
}

/// A relation as returned with `$expand=relations`.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ItemRelation {
    pub rel: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<serde_json::Value>,
}

impl ItemRelation {
    pub fn kind(&self) -> Option<RelationKind> {
        RelationKind::from_rel_name(&self.rel)
    }

    /// Work item id at the end of a `.../workItems/{id}` URL.
    pub fn target_id(&self) -> Option<u64> {
        match self.kind() {
            Some(RelationKind::Parent | RelationKind::Child) => self
                .url
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .and_then(|segment| segment.parse().ok()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation(rel: &str, url: &str) -> ItemRelation {
        ItemRelation {
            rel: rel.to_string(),
            url: url.to_string(),
            attributes: None,
        }
    }

    #[test]
    fn test_target_id_from_hierarchy_link() {
        let parent = relation(
            "System.LinkTypes.Hierarchy-Reverse",
            "https://dev.azure.com/contoso/_apis/wit/workItems/42",
        );
        assert_eq!(parent.kind(), Some(RelationKind::Parent));
        assert_eq!(parent.target_id(), Some(42));
    }

    #[test]
    fn test_attachment_has_no_target_id() {
        let file = relation(
            "AttachedFile",
            "https://dev.azure.com/contoso/_apis/wit/attachments/abc",
        );
        assert_eq!(file.kind(), Some(RelationKind::AttachedFile));
        assert_eq!(file.target_id(), None);
    }
}
