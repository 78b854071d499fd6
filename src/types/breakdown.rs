use std::collections::HashSet;

use serde::Deserialize;

/// Locally authored work breakdown: epics → features → stories.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Breakdown {
    pub epics: Vec<EpicNode>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct EpicNode {
    #[serde(default = "unknown_epic")]
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub features: Vec<FeatureNode>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct FeatureNode {
    #[serde(default = "unknown_feature")]
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub stories: Vec<StoryNode>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct StoryNode {
    #[serde(default = "unknown_story")]
    pub title: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub fe_days: f64,
    #[serde(default)]
    pub be_days: f64,
    #[serde(default)]
    pub devops_days: f64,
    #[serde(default)]
    pub design_days: f64,
    #[serde(default)]
    pub acceptance_criteria: Option<AcceptanceCriteria>,
    #[serde(default)]
    pub user_story: Option<String>,
}

/// Acceptance criteria as authored: one block of text or an ordered list.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(from = "RawCriteria")]
pub enum AcceptanceCriteria {
    Text(String),
    Items(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCriteria {
    Text(String),
    Items(Vec<Option<String>>),
}

impl From<RawCriteria> for AcceptanceCriteria {
    fn from(raw: RawCriteria) -> Self {
        match raw {
            RawCriteria::Text(text) => AcceptanceCriteria::Text(text),
            RawCriteria::Items(items) => AcceptanceCriteria::Items(
                items
                    .into_iter()
                    .flatten()
                    .filter(|item| !item.trim().is_empty())
                    .collect(),
            ),
        }
    }
}

fn unknown_epic() -> String {
    "Unknown Epic".to_string()
}

fn unknown_feature() -> String {
    "Unknown Feature".to_string()
}

fn unknown_story() -> String {
    "Unknown Story".to_string()
}

impl Breakdown {
    pub fn feature_count(&self) -> usize {
        self.epics.iter().map(|e| e.features.len()).sum()
    }

    pub fn story_count(&self) -> usize {
        self.epics
            .iter()
            .flat_map(|e| &e.features)
            .map(|f| f.stories.len())
            .sum()
    }

    /// Sum of every story's effort, computed straight from the day counts.
    pub fn total_days(&self) -> f64 {
        self.epics
            .iter()
            .flat_map(|e| &e.features)
            .flat_map(|f| &f.stories)
            .map(|s| s.fe_days + s.be_days + s.devops_days + s.design_days)
            .sum()
    }

    /// First epic or feature key that occurs more than once on its level.
    /// Those keys index the push mapping, so they must be unique.
    pub fn duplicate_key(&self) -> Option<(&'static str, &str)> {
        let mut epics = HashSet::new();
        let mut features = HashSet::new();
        for epic in &self.epics {
            if !epics.insert(epic.key()) {
                return Some(("epic", epic.key()));
            }
            for feature in &epic.features {
                if !features.insert(feature.key()) {
                    return Some(("feature", feature.key()));
                }
            }
        }
        None
    }
}

impl EpicNode {
    /// Explicit id, or the name when none was authored.
    pub fn key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }
}

impl FeatureNode {
    pub fn key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }
}

impl StoryNode {
    pub fn key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.title)
    }

    pub fn total_effort(&self) -> f64 {
        self.fe_days + self.be_days + self.devops_days + self.design_days
    }

    /// Narrative text, defaulting to a generic "As a user" sentence.
    pub fn narrative(&self) -> String {
        match self.user_story.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(text) => text.to_string(),
            None => format!("As a user, I want to {}.", self.title.to_lowercase()),
        }
    }
}
