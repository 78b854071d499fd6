use std::fmt;

use colored::Colorize;

/// Work item types the sync engine knows about, top of the hierarchy first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkItemType {
    /// Top-level grouping
    Epic,
    /// Child of an epic
    Feature,
    /// Child of a feature
    UserStory,
    /// Discipline task under a user story
    Task,
}

impl WorkItemType {
    /// Parse the ADO wire name (`System.WorkItemType`).
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "Epic" => Some(WorkItemType::Epic),
            "Feature" => Some(WorkItemType::Feature),
            "User Story" => Some(WorkItemType::UserStory),
            "Task" => Some(WorkItemType::Task),
            _ => None,
        }
    }

    /// Name used in ADO URLs and fields.
    pub fn wire_name(self) -> &'static str {
        match self {
            WorkItemType::Epic => "Epic",
            WorkItemType::Feature => "Feature",
            WorkItemType::UserStory => "User Story",
            WorkItemType::Task => "Task",
        }
    }

    /// Type a parent of this type must have.
    pub fn parent(self) -> Option<Self> {
        match self {
            WorkItemType::Epic => None,
            WorkItemType::Feature => Some(WorkItemType::Epic),
            WorkItemType::UserStory => Some(WorkItemType::Feature),
            WorkItemType::Task => Some(WorkItemType::UserStory),
        }
    }

    /// Get the colored label for terminal output.
    pub fn colored(self) -> String {
        let label = self.wire_name();
        match self {
            WorkItemType::Epic => label.magenta().bold().to_string(),
            WorkItemType::Feature => label.cyan().to_string(),
            WorkItemType::UserStory => label.blue().to_string(),
            WorkItemType::Task => label.bright_black().to_string(),
        }
    }
}

impl fmt::Display for WorkItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip() {
        for ty in [
            WorkItemType::Epic,
            WorkItemType::Feature,
            WorkItemType::UserStory,
            WorkItemType::Task,
        ] {
            assert_eq!(WorkItemType::from_wire(ty.wire_name()), Some(ty));
        }
        assert_eq!(WorkItemType::from_wire("Bug"), None);
    }

    #[test]
    fn test_parent_chain() {
        assert_eq!(WorkItemType::Task.parent(), Some(WorkItemType::UserStory));
        assert_eq!(WorkItemType::UserStory.parent(), Some(WorkItemType::Feature));
        assert_eq!(WorkItemType::Feature.parent(), Some(WorkItemType::Epic));
        assert_eq!(WorkItemType::Epic.parent(), None);
    }
}
