//! Turns flat query results into an epic/feature/story view and into the
//! story bundles handed to downstream analysis.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{fields, ScreenRef, WorkItemRecord, WorkItemType};

pub const VALIDATION_BUNDLE_FILE: &str = "validation_bundle.json";
pub const ENRICHMENT_BUNDLE_FILE: &str = "enrichment_bundle.json";

/// Records grouped by type, each group in query order.
#[derive(Debug, Default, Serialize)]
pub struct Hierarchy {
    pub epics: Vec<WorkItemRecord>,
    pub features: Vec<WorkItemRecord>,
    pub stories: Vec<WorkItemRecord>,
}

/// Group records by declared type. Tasks and unknown types are dropped.
pub fn classify(records: Vec<WorkItemRecord>) -> Hierarchy {
    let mut hierarchy = Hierarchy::default();
    for record in records {
        match record.item_type() {
            Some(WorkItemType::Epic) => hierarchy.epics.push(record),
            Some(WorkItemType::Feature) => hierarchy.features.push(record),
            Some(WorkItemType::UserStory) => hierarchy.stories.push(record),
            Some(WorkItemType::Task) | None => {}
        }
    }
    hierarchy
}

impl Hierarchy {
    /// Features of an epic, or stories of a feature.
    pub fn children_of(&self, id: u64) -> Vec<&WorkItemRecord> {
        self.features
            .iter()
            .chain(&self.stories)
            .filter(|r| r.parent == Some(id))
            .collect()
    }

    fn group(&self, item_type: WorkItemType) -> &[WorkItemRecord] {
        match item_type {
            WorkItemType::Epic => &self.epics,
            WorkItemType::Feature => &self.features,
            WorkItemType::UserStory => &self.stories,
            WorkItemType::Task => &[],
        }
    }

    /// Features and stories whose parent is not among the fetched records
    /// of the expected parent type.
    pub fn orphans(&self) -> Vec<&WorkItemRecord> {
        self.features
            .iter()
            .chain(&self.stories)
            .filter(|record| {
                let parents = record
                    .item_type()
                    .and_then(WorkItemType::parent)
                    .map(|ty| self.group(ty))
                    .unwrap_or_default();
                !record
                    .parent
                    .is_some_and(|p| parents.iter().any(|r| r.id == p))
            })
            .collect()
    }
}

/// Acceptance criteria of a story: the normalized field first, then the
/// raw field path, else empty.
pub fn acceptance_criteria(record: &WorkItemRecord) -> String {
    record
        .acceptance_criteria
        .as_deref()
        .filter(|ac| !ac.is_empty())
        .or_else(|| record.raw_text(fields::ACCEPTANCE_CRITERIA))
        .unwrap_or_default()
        .to_string()
}

/// Story as it appears in a bundle.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StoryRecord {
    pub ado_id: u64,
    pub title: String,
    pub description: String,
    pub acceptance_criteria: String,
    pub tags: String,
    pub state: String,
}

impl From<&WorkItemRecord> for StoryRecord {
    fn from(record: &WorkItemRecord) -> Self {
        Self {
            ado_id: record.id,
            title: record.title.clone(),
            description: record.description.clone(),
            acceptance_criteria: acceptance_criteria(record),
            tags: record.tags_joined(),
            state: record.state.clone(),
        }
    }
}

/// Outcome of narrowing the fetched stories.
#[derive(Debug)]
pub enum StorySelection {
    /// No filter was given.
    All(Vec<WorkItemRecord>),
    /// Some requested ids were found.
    Matched {
        stories: Vec<WorkItemRecord>,
        requested: usize,
    },
    /// Stories exist, but none has a requested id.
    NoMatch { available: usize },
    /// ADO returned no stories at all.
    Empty,
}

impl StorySelection {
    pub fn stories(&self) -> &[WorkItemRecord] {
        match self {
            StorySelection::All(stories) | StorySelection::Matched { stories, .. } => stories,
            StorySelection::NoMatch { .. } | StorySelection::Empty => &[],
        }
    }
}

/// Keep only stories whose id is in `ids`; `None` keeps everything.
pub fn select_stories(stories: Vec<WorkItemRecord>, ids: Option<&[String]>) -> StorySelection {
    if stories.is_empty() {
        return StorySelection::Empty;
    }

    let Some(ids) = ids.filter(|ids| !ids.is_empty()) else {
        return StorySelection::All(stories);
    };

    let wanted: HashSet<&str> = ids.iter().map(|id| id.trim()).collect();
    let available = stories.len();
    let matched: Vec<WorkItemRecord> = stories
        .into_iter()
        .filter(|s| wanted.contains(s.id.to_string().as_str()))
        .collect();

    if matched.is_empty() {
        StorySelection::NoMatch { available }
    } else {
        StorySelection::Matched {
            stories: matched,
            requested: ids.len(),
        }
    }
}

/// Screens plus stories, keyed by the design file they were taken from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Bundle {
    pub figma_file_key: String,
    pub screens: Vec<ScreenRef>,
    pub stories: Vec<StoryRecord>,
}

impl Bundle {
    pub fn new(file_key: &str, screens: Vec<ScreenRef>, stories: &[WorkItemRecord]) -> Self {
        Self {
            figma_file_key: file_key.to_string(),
            screens,
            stories: stories.iter().map(StoryRecord::from).collect(),
        }
    }
}
