mod attachment;
mod breakdown;
mod item_type;
mod relation;
mod screen;
mod work_item;

pub use attachment::AttachmentReference;
pub use breakdown::{AcceptanceCriteria, Breakdown, EpicNode, FeatureNode, StoryNode};
pub use item_type::WorkItemType;
pub use relation::{ItemRelation, RelationKind};
pub use screen::ScreenRef;
pub use work_item::{fields, AdoWorkItem, WorkItemRecord, WorkItemRef};
