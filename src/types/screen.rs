use serde::{Deserialize, Serialize};

/// One design frame rendered to a local screenshot.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ScreenRef {
    pub name: String,
    pub node_id: String,
    pub page: String,
    pub screenshot_path: String,
}
