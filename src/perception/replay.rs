//! Replays still images from a directory as if they were camera frames.
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::errors::{QrLensError, QrLensResult};
use crate::perception::traits::FrameSource;
use crate::perception::types::{Frame, Rotation};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp", "tif", "tiff"];

pub struct DirectorySource {
    dir: PathBuf,
    rotation: Rotation,
    loop_frames: bool,
    files: Vec<PathBuf>,
    cursor: usize,
    sequence: u64,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>, rotation: Rotation, loop_frames: bool) -> Self {
        Self {
            dir: dir.into(),
            rotation,
            loop_frames,
            files: Vec::new(),
            cursor: 0,
            sequence: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn is_image_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}

async fn list_images(dir: &Path) -> QrLensResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if is_image_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[async_trait]
impl FrameSource for DirectorySource {
    fn name(&self) -> &str {
        "directory"
    }

    async fn open(&mut self) -> QrLensResult<()> {
        let meta = tokio::fs::metadata(&self.dir).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                QrLensError::PermissionDenied(format!("{}: {e}", self.dir.display()))
            }
            _ => QrLensError::Capture(format!("{}: {e}", self.dir.display())),
        })?;
        if !meta.is_dir() {
            return Err(QrLensError::Capture(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }

        self.files = list_images(&self.dir).await?;
        self.cursor = 0;
        tracing::info!(
            dir = %self.dir.display(),
            frames = self.files.len(),
            "directory source opened"
        );
        Ok(())
    }

    async fn next_frame(&mut self) -> QrLensResult<Option<Frame>> {
        if self.files.is_empty() {
            return Ok(None);
        }
        if self.cursor >= self.files.len() {
            if !self.loop_frames {
                return Ok(None);
            }
            self.cursor = 0;
        }

        let path = self.files[self.cursor].clone();
        self.cursor += 1;

        let image = tokio::task::spawn_blocking(move || image::open(&path).map(|img| img.to_rgba8()))
            .await
            .map_err(|e| QrLensError::Capture(format!("frame load join: {e}")))??;

        let frame = Frame::new(self.sequence, image, self.rotation);
        self.sequence += 1;
        Ok(Some(frame))
    }
}
