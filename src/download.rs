//! Download mechanism
//!
//! The export path hands a finished [`ExportArtifact`] to a `Downloader`,
//! the equivalent of the browser's client-side save. The handoff is
//! fire-and-forget: implementations log failures instead of returning them,
//! and no success callback is consumed.

use std::path::PathBuf;

use crate::scene::ExportArtifact;

/// Client-side save collaborator
pub trait Downloader {
    fn save(&self, artifact: &ExportArtifact);
}

/// Writes artifacts into a target directory under their configured filename
pub struct FileDownloader {
    dir: PathBuf,
}

impl FileDownloader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Where `artifact` will be (or was) written
    pub fn target_path(&self, artifact: &ExportArtifact) -> PathBuf {
        self.dir.join(&artifact.filename)
    }
}

impl Downloader for FileDownloader {
    fn save(&self, artifact: &ExportArtifact) {
        let path = self.target_path(artifact);
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match std::fs::write(&path, &artifact.png_data) {
            Ok(()) => log::info!(
                "saved {} ({} bytes)",
                path.display(),
                artifact.png_data.len()
            ),
            Err(err) => log::error!("failed to save {}: {}", path.display(), err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_downloader_writes_artifact_bytes() {
        let dir = std::env::temp_dir().join(format!("snapcanvas-dl-{}", std::process::id()));
        let sink = FileDownloader::new(&dir);
        let artifact = ExportArtifact {
            width: 1,
            height: 1,
            filename: "image-with-text.png".to_string(),
            png_data: vec![137, 80, 78, 71],
        };

        sink.save(&artifact);
        let written = std::fs::read(sink.target_path(&artifact)).expect("file written");
        assert_eq!(written, artifact.png_data);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
