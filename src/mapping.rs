//! Local key → ADO id mapping produced by one push run.

use std::fmt;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::artifact;
use crate::error::Result;

pub const MAPPING_FILE: &str = "ado_mapping.json";
pub const PARTIAL_MAPPING_FILE: &str = "ado_mapping.partial.json";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    pub epics: KeyedIds,
    pub features: KeyedIds,
    pub stories: Vec<StoryMapping>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StoryMapping {
    pub ado_id: Option<u64>,
    pub id: String,
    pub title: String,
    pub epic: String,
    pub feature: String,
}

impl Mapping {
    /// Items that actually exist remotely.
    pub fn created_count(&self) -> usize {
        self.epics.created_count()
            + self.features.created_count()
            + self.stories.iter().filter(|s| s.ado_id.is_some()).count()
    }

    /// True when no entry carries a remote id.
    pub fn is_placeholder_only(&self) -> bool {
        self.created_count() == 0
    }
}

/// Local key → remote id pairs in the order the items were pushed.
/// Serialized as a JSON object whose keys keep that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyedIds(Vec<(String, Option<u64>)>);

impl KeyedIds {
    /// Record `id` under `key`. An existing key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, id: Option<u64>) {
        let key = key.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = id,
            None => self.0.push((key, id)),
        }
    }

    pub fn get(&self, key: &str) -> Option<Option<u64>> {
        self.0
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, id)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<u64>)> {
        self.0.iter().map(|(key, id)| (key.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn created_count(&self) -> usize {
        self.0.iter().filter(|(_, id)| id.is_some()).count()
    }
}

impl Serialize for KeyedIds {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(self.0.iter().map(|(key, id)| (key, id)))
    }
}

impl<'de> Deserialize<'de> for KeyedIds {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(KeyedIdsVisitor)
    }
}

struct KeyedIdsVisitor;

impl<'de> Visitor<'de> for KeyedIdsVisitor {
    type Value = KeyedIds;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object of keys to work item ids")
    }

    fn visit_map<A>(self, mut entries: A) -> std::result::Result<KeyedIds, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut ids = KeyedIds::default();
        while let Some((key, id)) = entries.next_entry::<String, Option<u64>>()? {
            ids.insert(key, id);
        }
        Ok(ids)
    }
}

/// Write the mapping in one go, replacing whatever was at `destination`.
pub fn persist(mapping: &Mapping, destination: &Path) -> Result<()> {
    artifact::write(destination, mapping)
}

/// Read a previously persisted mapping. Unparsable content is reported
/// and treated as absent.
pub fn load(path: &Path) -> Option<Mapping> {
    artifact::load_or_absent(path)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample() -> Mapping {
        let mut mapping = Mapping::default();
        mapping.epics.insert("E1", Some(10));
        mapping.features.insert("Cart", Some(11));
        mapping.stories.push(StoryMapping {
            ado_id: Some(12),
            id: "US-001".into(),
            title: "Add item".into(),
            epic: "Shop".into(),
            feature: "Cart".into(),
        });
        mapping
    }

    #[test]
    fn test_artifact_shape() {
        assert_eq!(
            serde_json::to_value(sample()).unwrap(),
            json!({
                "epics": { "E1": 10 },
                "features": { "Cart": 11 },
                "stories": [{
                    "ado_id": 12,
                    "id": "US-001",
                    "title": "Add item",
                    "epic": "Shop",
                    "feature": "Cart"
                }]
            })
        );
    }

    #[test]
    fn test_persist_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MAPPING_FILE);

        persist(&sample(), &path).unwrap();
        assert_eq!(load(&path), Some(sample()));
    }

    #[test]
    fn test_keys_keep_push_order() {
        let mut mapping = Mapping::default();
        for (key, id) in [("Zebra", Some(1)), ("Apple", Some(2)), ("Mango", None)] {
            mapping.epics.insert(key, id);
        }
        mapping.epics.insert("Apple", Some(5));

        let keys: Vec<&str> = mapping.epics.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["Zebra", "Apple", "Mango"]);
        assert_eq!(mapping.epics.get("Apple"), Some(Some(5)));

        let text = serde_json::to_string(&mapping).unwrap();
        let zebra = text.find("Zebra").unwrap();
        let apple = text.find("Apple").unwrap();
        let mango = text.find("Mango").unwrap();
        assert!(zebra < apple && apple < mango);

        let reloaded: Mapping = serde_json::from_str(&text).unwrap();
        assert_eq!(reloaded, mapping);
    }

    #[test]
    fn test_malformed_mapping_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MAPPING_FILE);
        assert_eq!(load(&path), None);

        std::fs::write(&path, r#"{ "epics": "#).unwrap();
        assert_eq!(load(&path), None);
    }

    #[test]
    fn test_created_count_ignores_placeholders() {
        let mut mapping = sample();
        assert_eq!(mapping.created_count(), 3);
        mapping.epics.insert("E2", None);
        assert_eq!(mapping.created_count(), 3);
        assert!(!mapping.is_placeholder_only());
        assert!(Mapping::default().is_placeholder_only());
    }
}
