//! Pushes a local breakdown into ADO as Epic → Feature → User Story → Task.
//!
//! The walk is strictly top-down and sequential: a child can only be linked
//! once its parent's remote id is known. Epic, Feature and Story failures
//! abort the run; Task failures are logged and skipped.

use serde::Serialize;
use tracing::{info, warn};

use crate::client::AdoClient;
use crate::error::{Result, SyncError};
use crate::items;
use crate::mapping::{Mapping, StoryMapping};
use crate::markup;
use crate::patch::{FieldPath, PatchDocument};
use crate::types::{Breakdown, StoryNode, WorkItemType};

pub const MARKER_TAG: &str = "presales";

/// Where a push goes. A dry run has no client, so it cannot mutate anything.
#[derive(Clone, Copy)]
pub enum PushTarget<'a> {
    DryRun,
    Live(&'a AdoClient),
}

impl PushTarget<'_> {
    pub fn is_dry_run(&self) -> bool {
        matches!(self, PushTarget::DryRun)
    }
}

/// Outcome of one push run.
#[derive(Debug, Default, Serialize)]
pub struct PushReport {
    pub dry_run: bool,
    pub epics: usize,
    pub features: usize,
    pub stories: usize,
    pub tasks_created: usize,
    pub tasks_failed: usize,
    /// Sum of the effort written on every story.
    pub total_effort: f64,
    pub mapping: Mapping,
}

/// Disciplines that get their own Task, with the title prefix used for it.
/// Design work has no execution task.
pub fn discipline_tasks(story: &StoryNode) -> Vec<(&'static str, f64)> {
    [
        ("FE", story.fe_days),
        ("BE", story.be_days),
        ("DevOps", story.devops_days),
    ]
    .into_iter()
    .filter(|(_, days)| *days > 0.0)
    .collect()
}

pub struct HierarchyWriter {
    project_name: String,
    marker_tag: String,
}

impl HierarchyWriter {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            marker_tag: MARKER_TAG.to_string(),
        }
    }

    pub fn with_marker_tag(mut self, tag: impl Into<String>) -> Self {
        self.marker_tag = tag.into();
        self
    }

    fn tags(&self, extra: &[&str]) -> String {
        let mut tags = vec![self.marker_tag.as_str(), self.project_name.as_str()];
        tags.extend_from_slice(extra);
        tags.join(";")
    }

    pub async fn push(&self, tree: &Breakdown, target: PushTarget<'_>) -> Result<PushReport> {
        if let Some((level, key)) = tree.duplicate_key() {
            return Err(SyncError::DuplicateKey {
                level,
                key: key.to_string(),
            });
        }

        if let PushTarget::Live(client) = target {
            info!("Testing ADO connection...");
            items::test_connection(client).await?;
        }

        let total_stories = tree.story_count();
        info!(
            "Will create: {} epics, {} features, {} stories",
            tree.epics.len(),
            tree.feature_count(),
            total_stories
        );

        let mut report = PushReport {
            dry_run: target.is_dry_run(),
            ..PushReport::default()
        };

        for epic in &tree.epics {
            info!("Epic: {}", epic.name);
            let patch = PatchDocument::new()
                .add_field(FieldPath::Title, epic.name.as_str())
                .add_field(FieldPath::Description, markup::epic_description(epic))
                .add_field(FieldPath::Tags, self.tags(&[]));

            let epic_id = self
                .create(target, WorkItemType::Epic, &epic.name, patch, &report.mapping)
                .await?;
            report.mapping.epics.insert(epic.key(), epic_id);
            report.epics += 1;

            for feature in &epic.features {
                info!("  Feature: {}", feature.name);
                let mut patch = PatchDocument::new()
                    .add_field(FieldPath::Title, feature.name.as_str())
                    .add_field(FieldPath::Description, markup::feature_description(feature))
                    .add_field(FieldPath::Tags, self.tags(&[epic.name.as_str()]));
                if let (PushTarget::Live(client), Some(parent)) = (target, epic_id) {
                    patch = patch.add_parent(&client.credentials().org_url(), parent);
                }

                let feature_id = self
                    .create(target, WorkItemType::Feature, &feature.name, patch, &report.mapping)
                    .await?;
                report.mapping.features.insert(feature.key(), feature_id);
                report.features += 1;

                for story in &feature.stories {
                    report.stories += 1;
                    info!("    [{}/{}] {}", report.stories, total_stories, story.title);

                    let effort = story.total_effort();
                    let narrative = story.narrative();
                    let mut patch = PatchDocument::new()
                        .add_field(FieldPath::Title, story.title.as_str())
                        .add_field(
                            FieldPath::Description,
                            markup::story_description(&narrative, &epic.name, &feature.name),
                        )
                        .add_field(
                            FieldPath::Tags,
                            self.tags(&[epic.name.as_str(), feature.name.as_str()]),
                        )
                        .add_field(FieldPath::Effort, effort)
                        .add_field(
                            FieldPath::AcceptanceCriteria,
                            markup::acceptance_criteria_html(story.acceptance_criteria.as_ref()),
                        );
                    if let (PushTarget::Live(client), Some(parent)) = (target, feature_id) {
                        patch = patch.add_parent(&client.credentials().org_url(), parent);
                    }

                    if target.is_dry_run() {
                        let preview: String = narrative.chars().take(100).collect();
                        info!("      User story: {preview}...");
                    }

                    let story_id = self
                        .create(target, WorkItemType::UserStory, &story.title, patch, &report.mapping)
                        .await?;
                    report.total_effort += effort;

                    if let (PushTarget::Live(client), Some(story_id)) = (target, story_id) {
                        self.create_tasks(client, story_id, story, &mut report).await;
                    }

                    report.mapping.stories.push(StoryMapping {
                        ado_id: story_id,
                        id: story.key().to_string(),
                        title: story.title.clone(),
                        epic: epic.name.clone(),
                        feature: feature.name.clone(),
                    });
                }
            }
        }

        info!(
            "Push complete: {} epics, {} features, {} stories, {} tasks, {} days total",
            report.epics, report.features, report.stories, report.tasks_created, report.total_effort
        );
        Ok(report)
    }

    /// Create one hierarchy item, or nothing on a dry run. A failure here is
    /// fatal and carries the mapping built so far.
    async fn create(
        &self,
        target: PushTarget<'_>,
        item_type: WorkItemType,
        title: &str,
        patch: PatchDocument,
        mapping: &Mapping,
    ) -> Result<Option<u64>> {
        let client = match target {
            PushTarget::DryRun => {
                info!("      [DRY RUN] Would create {item_type}: {title}");
                return Ok(None);
            }
            PushTarget::Live(client) => client,
        };

        match items::create(client, item_type, &patch).await {
            Ok(id) => {
                info!("      Created {item_type} #{id}");
                Ok(Some(id))
            }
            Err(source) => Err(SyncError::Aborted {
                item: format!("{item_type} '{title}'"),
                mapping: Box::new(mapping.clone()),
                source: Box::new(source),
            }),
        }
    }

    async fn create_tasks(
        &self,
        client: &AdoClient,
        story_id: u64,
        story: &StoryNode,
        report: &mut PushReport,
    ) {
        for (prefix, days) in discipline_tasks(story) {
            let title = format!("[{prefix}] {}", story.title);
            let patch = PatchDocument::new()
                .add_field(FieldPath::Title, title.as_str())
                .add_field(FieldPath::Tags, self.tags(&[]))
                .add_field(FieldPath::Effort, days)
                .add_parent(&client.credentials().org_url(), story_id);

            match items::create(client, WorkItemType::Task, &patch).await {
                Ok(id) => {
                    info!("        Created Task #{id} {title}");
                    report.tasks_created += 1;
                }
                Err(source) => {
                    let failure = SyncError::PartialItemFailure {
                        item: format!("{prefix} task for story #{story_id}"),
                        source: Box::new(source),
                    };
                    warn!("{failure}");
                    report.tasks_failed += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use serde_json::{json, Value};

    use super::*;
    use crate::backend::fake::{reply, FakeBackend};
    use crate::backend::{HttpRequest, RequestBody};
    use crate::client::tests::test_client;

    fn scenario_tree() -> Breakdown {
        serde_json::from_value(json!({
            "epics": [{
                "name": "Shop",
                "id": "E1",
                "description": "Online store",
                "features": [{
                    "name": "Cart",
                    "stories": [
                        {
                            "title": "Story A",
                            "id": "US-001",
                            "fe_days": 2, "be_days": 3, "devops_days": 0, "design_days": 1,
                            "acceptance_criteria": ["adds item", "shows total"]
                        },
                        {
                            "title": "Story B",
                            "fe_days": 0, "be_days": 0, "devops_days": 0, "design_days": 0,
                            "acceptance_criteria": "nothing to do"
                        }
                    ]
                }]
            }]
        }))
        .unwrap()
    }

    fn patch_of(request: &HttpRequest) -> &Value {
        match &request.body {
            Some(RequestBody::Json { value, .. }) => value,
            other => panic!("expected JSON patch, got {other:?}"),
        }
    }

    fn field<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a Value> {
        patch_of(request)
            .as_array()
            .unwrap()
            .iter()
            .find(|op| op["path"] == format!("/fields/{name}"))
            .map(|op| &op["value"])
    }

    fn parent_url(request: &HttpRequest) -> Option<String> {
        patch_of(request)
            .as_array()
            .unwrap()
            .iter()
            .find(|op| op["path"] == "/relations/-")
            .and_then(|op| op["value"]["url"].as_str())
            .map(String::from)
    }

    fn script_connection_check(backend: &FakeBackend) {
        backend.push_json(json!({ "id": "p-1", "name": "Web Shop" }));
    }

    #[test]
    fn test_discipline_tasks_skip_design_and_zero_days() {
        let tree = scenario_tree();
        let story = &tree.epics[0].features[0].stories[0];
        assert_eq!(discipline_tasks(story), vec![("FE", 2.0), ("BE", 3.0)]);

        let mut tiny = story.clone();
        tiny.fe_days = 0.0;
        tiny.be_days = 0.0;
        tiny.devops_days = 0.25;
        tiny.design_days = 40.0;
        assert_eq!(discipline_tasks(&tiny), vec![("DevOps", 0.25)]);
    }

    #[tokio::test]
    async fn test_scenario_one_epic_one_feature_two_stories() {
        let backend = FakeBackend::new();
        script_connection_check(&backend);
        for id in 1..=6 {
            backend.push_json(json!({ "id": id }));
        }
        let client = test_client(&backend);
        let tree = scenario_tree();

        let report = HierarchyWriter::new("webshop")
            .push(&tree, PushTarget::Live(&client))
            .await
            .unwrap();

        assert_eq!((report.epics, report.features, report.stories), (1, 1, 2));
        assert_eq!(report.tasks_created, 2);
        assert_eq!(report.tasks_failed, 0);
        assert_eq!(report.total_effort, 6.0);
        assert_eq!(report.total_effort, tree.total_days());

        let sent = backend.recorded();
        // connection check, epic, feature, story A, FE task, BE task, story B
        assert_eq!(sent.len(), 7);
        assert_eq!(sent[0].method, Method::GET);
        assert!(sent[1].url.contains("$Epic"));
        assert!(sent[2].url.contains("$Feature"));
        assert!(sent[3].url.contains("$User%20Story"));
        assert!(sent[4].url.contains("$Task"));
        assert!(sent[5].url.contains("$Task"));
        assert!(sent[6].url.contains("$User%20Story"));

        assert_eq!(field(&sent[4], "System.Title"), Some(&json!("[FE] Story A")));
        assert_eq!(field(&sent[5], "System.Title"), Some(&json!("[BE] Story A")));
        assert_eq!(field(&sent[4], "Microsoft.VSTS.Scheduling.Effort"), Some(&json!(2.0)));
        assert_eq!(field(&sent[5], "Microsoft.VSTS.Scheduling.Effort"), Some(&json!(3.0)));

        assert_eq!(field(&sent[3], "Microsoft.VSTS.Scheduling.Effort"), Some(&json!(6.0)));
        assert_eq!(field(&sent[6], "Microsoft.VSTS.Scheduling.Effort"), Some(&json!(0.0)));
        assert_eq!(
            field(&sent[3], "Microsoft.VSTS.Common.AcceptanceCriteria"),
            Some(&json!("<ol><li>adds item</li><li>shows total</li></ol>"))
        );
        assert_eq!(
            field(&sent[3], "System.Tags"),
            Some(&json!("presales;webshop;Shop;Cart"))
        );
        assert_eq!(field(&sent[1], "System.Tags"), Some(&json!("presales;webshop")));
        assert_eq!(field(&sent[4], "System.Tags"), Some(&json!("presales;webshop")));

        // parent links follow the ids handed out above
        assert_eq!(parent_url(&sent[1]), None);
        assert!(parent_url(&sent[2]).unwrap().ends_with("/workItems/1"));
        assert!(parent_url(&sent[3]).unwrap().ends_with("/workItems/2"));
        assert!(parent_url(&sent[4]).unwrap().ends_with("/workItems/3"));
        assert!(parent_url(&sent[6]).unwrap().ends_with("/workItems/2"));

        assert_eq!(report.mapping.epics.get("E1"), Some(Some(1)));
        assert_eq!(report.mapping.features.get("Cart"), Some(Some(2)));
        let stories: Vec<(Option<u64>, &str)> = report
            .mapping
            .stories
            .iter()
            .map(|s| (s.ado_id, s.id.as_str()))
            .collect();
        assert_eq!(stories, vec![(Some(3), "US-001"), (Some(6), "Story B")]);
    }

    #[tokio::test]
    async fn test_dry_run_records_placeholders_only() {
        let tree = scenario_tree();

        let report = HierarchyWriter::new("webshop")
            .push(&tree, PushTarget::DryRun)
            .await
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.epics, tree.epics.len());
        assert_eq!(report.features, tree.feature_count());
        assert_eq!(report.stories, tree.story_count());
        assert_eq!(report.tasks_created, 0);
        assert_eq!(report.total_effort, 6.0);
        assert_eq!(report.mapping.epics.len(), 1);
        assert_eq!(report.mapping.features.len(), 1);
        assert_eq!(report.mapping.stories.len(), 2);
        assert!(report.mapping.is_placeholder_only());
    }

    #[tokio::test]
    async fn test_failed_connection_aborts_before_any_mutation() {
        let backend = FakeBackend::new();
        backend.always(reply(401, json!({ "message": "unauthorized" })));
        let client = test_client(&backend);

        let err = HierarchyWriter::new("webshop")
            .push(&scenario_tree(), PushTarget::Live(&client))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Connectivity { .. }));
        assert_eq!(backend.count(), 1);
        assert!(backend.recorded().iter().all(|r| r.method == Method::GET));
    }

    #[tokio::test]
    async fn test_duplicate_feature_keys_are_rejected_before_any_request() {
        let tree: Breakdown = serde_json::from_value(json!({
            "epics": [
                { "name": "A", "features": [{ "name": "Auth" }] },
                { "name": "B", "features": [{ "name": "Auth" }] }
            ]
        }))
        .unwrap();

        let dry = HierarchyWriter::new("webshop")
            .push(&tree, PushTarget::DryRun)
            .await
            .unwrap_err();
        assert!(matches!(
            dry,
            SyncError::DuplicateKey { level: "feature", ref key } if key == "Auth"
        ));

        let backend = FakeBackend::new();
        let client = test_client(&backend);
        let live = HierarchyWriter::new("webshop")
            .push(&tree, PushTarget::Live(&client))
            .await
            .unwrap_err();
        assert!(matches!(live, SyncError::DuplicateKey { .. }));
        assert_eq!(backend.count(), 0);
    }

    #[tokio::test]
    async fn test_task_failure_does_not_abort() {
        let backend = FakeBackend::new();
        script_connection_check(&backend);
        backend
            .push_json(json!({ "id": 1 }))
            .push_json(json!({ "id": 2 }))
            .push_json(json!({ "id": 3 }))
            .push(reply(400, json!({ "message": "field rejected" })))
            .push_json(json!({ "id": 5 }))
            .push_json(json!({ "id": 6 }));
        let client = test_client(&backend);

        let report = HierarchyWriter::new("webshop")
            .push(&scenario_tree(), PushTarget::Live(&client))
            .await
            .unwrap();

        assert_eq!(report.tasks_created, 1);
        assert_eq!(report.tasks_failed, 1);
        assert_eq!(report.stories, 2);
        assert_eq!(report.mapping.stories[1].ado_id, Some(6));
    }

    #[tokio::test]
    async fn test_feature_failure_is_fatal_and_keeps_partial_mapping() {
        let backend = FakeBackend::new();
        script_connection_check(&backend);
        backend
            .push_json(json!({ "id": 1 }))
            .always(reply(400, json!({ "message": "bad parent" })));
        let client = test_client(&backend);

        let err = HierarchyWriter::new("webshop")
            .push(&scenario_tree(), PushTarget::Live(&client))
            .await
            .unwrap_err();

        assert_eq!(backend.count(), 3);
        match err {
            SyncError::Aborted { item, mapping, .. } => {
                assert_eq!(item, "Feature 'Cart'");
                assert_eq!(mapping.epics.get("E1"), Some(Some(1)));
                assert!(mapping.features.is_empty());
                assert!(mapping.stories.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_custom_marker_tag() {
        let backend = FakeBackend::new();
        script_connection_check(&backend);
        backend.push_json(json!({ "id": 1 }));
        let client = test_client(&backend);
        let tree: Breakdown =
            serde_json::from_value(json!({ "epics": [{ "name": "Solo" }] })).unwrap();

        HierarchyWriter::new("webshop")
            .with_marker_tag("estimate")
            .push(&tree, PushTarget::Live(&client))
            .await
            .unwrap();

        assert_eq!(
            field(&backend.recorded()[1], "System.Tags"),
            Some(&json!("estimate;webshop"))
        );
    }
}
