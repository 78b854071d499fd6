//! Design screenshots from Figma for the validation and enrichment bundles.
//!
//! Plain sequential fetches: no retry, no throttling. A frame whose image
//! cannot be resolved or downloaded is skipped with a warning.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use crate::backend::{HttpBackend, HttpRequest, HttpResponse, ReqwestBackend};
use crate::client::excerpt;
use crate::error::{Result, SyncError};
use crate::types::ScreenRef;

const FIGMA_API: &str = "https://api.figma.com";

/// Max node ids per image-URL request.
pub const IMAGE_BATCH_SIZE: usize = 50;

static FILE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"figma\.com/(?:design|file)/([a-zA-Z0-9]+)").unwrap());
static UNSAFE_CHARS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\-.]").unwrap());

/// File key from a `figma.com/design/<KEY>/...` or `figma.com/file/<KEY>/...` link.
pub fn extract_file_key(link: &str) -> Option<String> {
    FILE_KEY_RE
        .captures(link)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

#[derive(Deserialize, Debug)]
pub struct Node {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Deserialize)]
struct FileResponse {
    document: Node,
}

#[derive(Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    images: HashMap<String, Option<String>>,
}

/// Top-level frame on one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub name: String,
    pub node_id: String,
    pub page: String,
}

/// Frames that sit directly on a page; nested frames are ignored.
pub fn collect_frames(document: &Node) -> Vec<Frame> {
    document
        .children
        .iter()
        .flat_map(|page| {
            let page_name = if page.name.is_empty() {
                "Unknown Page"
            } else {
                page.name.as_str()
            };
            page.children
                .iter()
                .filter(|child| child.node_type == "FRAME")
                .map(move |child| Frame {
                    name: if child.name.is_empty() {
                        "Untitled".to_string()
                    } else {
                        child.name.clone()
                    },
                    node_id: child.id.clone(),
                    page: page_name.to_string(),
                })
        })
        .collect()
}

/// `<sanitized name>_<node id with ':' replaced>.png`
pub fn screenshot_filename(frame: &Frame) -> String {
    let safe_name = UNSAFE_CHARS_RE.replace_all(&frame.name, "_");
    format!("{}_{}.png", safe_name, frame.node_id.replace(':', "-"))
}

/// Display name recovered from a screenshot file name. Lossy: underscores
/// in the original frame name come back as spaces.
pub fn screen_name_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let name = stem.rsplit_once('_').map(|(name, _)| name).unwrap_or(stem);
    name.replace('_', " ")
}

/// Screens for previously downloaded `*.png` files, sorted by path. Node id
/// and page cannot be recovered and are left empty.
pub fn reuse_existing(dir: &Path) -> Result<Vec<ScreenRef>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
        .collect();
    files.sort();

    Ok(files
        .iter()
        .map(|path| ScreenRef {
            name: screen_name_from_path(path),
            node_id: String::new(),
            page: String::new(),
            screenshot_path: path.display().to_string(),
        })
        .collect())
}

pub struct FigmaClient {
    backend: Box<dyn HttpBackend>,
    token: String,
}

impl FigmaClient {
    pub fn new(token: String) -> Self {
        Self::with_backend(token, Box::new(ReqwestBackend::new()))
    }

    pub fn with_backend(token: String, backend: Box<dyn HttpBackend>) -> Self {
        Self { backend, token }
    }

    /// One attempt; any non-2xx status is an error.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self.backend.send(&request).await?;
        if !response.is_success() {
            return Err(SyncError::Api {
                status: response.status,
                reason: response.reason.clone(),
                url: request.url,
                excerpt: excerpt(&response.text(), 500),
                attempts: 1,
            });
        }
        Ok(response)
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let mut request = HttpRequest::get(format!("{FIGMA_API}{endpoint}"));
        request.headers.push(("X-FIGMA-TOKEN", self.token.clone()));
        let url = request.url.clone();

        let response = self.send(request).await?;
        serde_json::from_slice(&response.body).map_err(|e| SyncError::UnexpectedResponse {
            url,
            message: e.to_string(),
        })
    }

    pub async fn file_document(&self, file_key: &str) -> Result<Node> {
        let file: FileResponse = self.get(&format!("/v1/files/{file_key}?depth=2")).await?;
        Ok(file.document)
    }

    /// Rendered PNG URLs for up to [`IMAGE_BATCH_SIZE`] node ids.
    pub async fn image_urls(
        &self,
        file_key: &str,
        node_ids: &[&str],
    ) -> Result<HashMap<String, Option<String>>> {
        let ids = node_ids
            .iter()
            .map(|id| urlencoding::encode(id).replace("%3A", ":"))
            .collect::<Vec<_>>()
            .join(",");
        let images: ImagesResponse = self
            .get(&format!("/v1/images/{file_key}?ids={ids}&format=png&scale=2"))
            .await?;
        Ok(images.images)
    }

    /// Fetch a rendered image. The URL is pre-signed, so no token is sent.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let url = Url::parse(url).map_err(|e| SyncError::UnexpectedResponse {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let response = self.send(HttpRequest::get(url.as_str())).await?;
        std::fs::write(dest, &response.body)?;
        Ok(())
    }

    /// Discover frames, resolve image URLs in batches and download each one.
    pub async fn fetch_screenshots(&self, file_key: &str, dir: &Path) -> Result<Vec<ScreenRef>> {
        info!("Fetching Figma file structure...");
        let document = self.file_document(file_key).await?;
        let frames = collect_frames(&document);
        if frames.is_empty() {
            return Err(SyncError::NoFrames(file_key.to_string()));
        }
        info!(
            "Found {} frames across {} pages",
            frames.len(),
            document.children.len()
        );

        std::fs::create_dir_all(dir)?;
        let mut screens = Vec::new();

        for (batch_index, batch) in frames.chunks(IMAGE_BATCH_SIZE).enumerate() {
            let start = batch_index * IMAGE_BATCH_SIZE;
            info!(
                "Requesting screenshots ({}-{}/{})...",
                start + 1,
                start + batch.len(),
                frames.len()
            );

            let ids: Vec<&str> = batch.iter().map(|f| f.node_id.as_str()).collect();
            let urls = match self.image_urls(file_key, &ids).await {
                Ok(urls) => urls,
                Err(e) => {
                    warn!("Failed to get image URLs: {e}");
                    continue;
                }
            };

            for frame in batch {
                let Some(url) = urls.get(&frame.node_id).and_then(|u| u.as_deref()) else {
                    warn!("No image URL for '{}'", frame.name);
                    continue;
                };

                let path = dir.join(screenshot_filename(frame));
                match self.download(url, &path).await {
                    Ok(()) => screens.push(ScreenRef {
                        name: frame.name.clone(),
                        node_id: frame.node_id.clone(),
                        page: frame.page.clone(),
                        screenshot_path: path.display().to_string(),
                    }),
                    Err(e) => warn!("Failed to download '{}': {e}", frame.name),
                }
            }
        }

        info!("Downloaded {} screenshots", screens.len());
        Ok(screens)
    }

    /// Reuse screenshots already on disk when allowed, else fetch fresh ones.
    pub async fn screenshots(
        &self,
        file_key: &str,
        dir: &Path,
        reuse: bool,
    ) -> Result<Vec<ScreenRef>> {
        if reuse {
            let existing = reuse_existing(dir)?;
            if !existing.is_empty() {
                info!(
                    "Reusing {} existing screenshots from {}",
                    existing.len(),
                    dir.display()
                );
                return Ok(existing);
            }
            info!("No existing screenshots found, fetching from Figma...");
        }
        self.fetch_screenshots(file_key, dir).await
    }
}
