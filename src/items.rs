//! Work item mutations and the connectivity check.

use std::path::Path;

use reqwest::Method;
use tracing::{debug, info};

use crate::backend::RequestBody;
use crate::client::{AdoClient, API_VERSION_PARAM};
use crate::error::{Result, SyncError};
use crate::patch::PatchDocument;
use crate::responses::{CreatedItem, ProjectInfo};
use crate::types::{AttachmentReference, WorkItemType};

/// Create one work item of `item_type` from a patch document.
pub async fn create(client: &AdoClient, item_type: WorkItemType, patch: &PatchDocument) -> Result<u64> {
    let path = format!("wit/workitems/${}", urlencoding::encode(item_type.wire_name()));
    let url = client.api_url(&path, None);
    let created: CreatedItem = client
        .execute_as(Method::POST, &url, Some(RequestBody::json_patch(patch.to_json())))
        .await?;
    debug!(id = created.id, %item_type, "Created work item");
    Ok(created.id)
}

/// Apply a patch document to an existing item.
pub async fn update(client: &AdoClient, id: u64, patch: &PatchDocument) -> Result<u64> {
    let url = client.api_url(&format!("wit/workitems/{id}"), None);
    let updated: CreatedItem = client
        .execute_as(Method::PATCH, &url, Some(RequestBody::json_patch(patch.to_json())))
        .await?;
    Ok(updated.id)
}

/// Fetch project info; anything but a response with an `id` is a failure.
pub async fn test_connection(client: &AdoClient) -> Result<ProjectInfo> {
    let credentials = client.credentials();
    let url = format!(
        "{}/_apis/projects/{}?{API_VERSION_PARAM}",
        credentials.org_url(),
        urlencoding::encode(&credentials.project)
    );

    let connectivity = |source: SyncError| SyncError::Connectivity {
        organization: credentials.organization.clone(),
        source: Box::new(source),
    };

    let info: ProjectInfo = client
        .execute_as(Method::GET, &url, None)
        .await
        .map_err(connectivity)?;

    if info.id.is_none() {
        return Err(connectivity(SyncError::UnexpectedResponse {
            url,
            message: "project info has no id".to_string(),
        }));
    }

    info!("Connected to ADO project '{}'", info.name);
    Ok(info)
}

/// Upload `file` and attach it to work item `id`.
///
/// Two calls: the raw bytes go to the attachments endpoint, then the
/// returned URL is linked onto the item as an `AttachedFile` relation.
pub async fn attach_file(
    client: &AdoClient,
    id: u64,
    file: &Path,
    file_name: Option<&str>,
    comment: Option<&str>,
) -> Result<u64> {
    if !file.is_file() {
        return Err(SyncError::FileNotFound(file.to_path_buf()));
    }

    let name = file_name
        .map(String::from)
        .or_else(|| file.file_name().and_then(|n| n.to_str()).map(String::from))
        .unwrap_or_else(|| "file".to_string());

    let bytes = std::fs::read(file)?;
    let upload_url = client.api_url(
        "wit/attachments",
        Some(&format!("fileName={}", urlencoding::encode(&name))),
    );
    let attachment: AttachmentReference = client
        .execute_as(Method::POST, &upload_url, Some(RequestBody::Bytes(bytes)))
        .await?;
    debug!(attachment = %attachment.id, "Uploaded attachment");

    let patch = PatchDocument::new().add_attachment(&attachment.url, comment.unwrap_or(&name));
    update(client, id, &patch).await
}
