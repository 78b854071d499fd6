use serde::Deserialize;

/// Reply to a raw attachment upload.
#[derive(Deserialize, Debug)]
pub struct AttachmentReference {
    pub id: String,
    pub url: String,
}
