//! HTML snippets written into work item descriptions.

use crate::types::{AcceptanceCriteria, EpicNode, FeatureNode};

pub const CRITERIA_PLACEHOLDER: &str = "<p>To be defined when designs are ready.</p>";

/// Render acceptance criteria into a single block. Absent or empty input
/// yields the placeholder.
pub fn acceptance_criteria_html(criteria: Option<&AcceptanceCriteria>) -> String {
    match criteria {
        Some(AcceptanceCriteria::Text(text)) if !text.trim().is_empty() => format!("<p>{text}</p>"),
        Some(AcceptanceCriteria::Items(items)) => {
            let entries: String = items
                .iter()
                .filter(|item| !item.trim().is_empty())
                .map(|item| format!("<li>{item}</li>"))
                .collect();
            if entries.is_empty() {
                CRITERIA_PLACEHOLDER.to_string()
            } else {
                format!("<ol>{entries}</ol>")
            }
        }
        _ => CRITERIA_PLACEHOLDER.to_string(),
    }
}

fn bullet_list<'a>(items: impl Iterator<Item = &'a str>) -> String {
    let entries: String = items.map(|item| format!("<li>{item}</li>")).collect();
    format!("<ul>{entries}</ul>")
}

/// Epic description with an index of its feature titles.
pub fn epic_description(epic: &EpicNode) -> String {
    format!(
        "<h3>{}</h3><p>{}</p><p><b>Features:</b></p>{}",
        epic.name,
        epic.description.as_deref().unwrap_or_default(),
        bullet_list(epic.features.iter().map(|f| f.name.as_str()))
    )
}

/// Feature description with an index of its story titles.
pub fn feature_description(feature: &FeatureNode) -> String {
    format!(
        "<h4>{}</h4><p><b>Stories:</b></p>{}",
        feature.name,
        bullet_list(feature.stories.iter().map(|s| s.title.as_str()))
    )
}

/// Story description: narrative plus the epic/feature it belongs to.
pub fn story_description(narrative: &str, epic: &str, feature: &str) -> String {
    format!(
        "<p><em>{narrative}</em></p>\n\n<table>\n\
         <tr><td><b>Epic</b></td><td>{epic}</td></tr>\n\
         <tr><td><b>Feature</b></td><td>{feature}</td></tr>\n\
         </table>"
    )
}
