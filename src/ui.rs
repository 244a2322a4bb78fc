//! Control-panel collaborator: enable/disable interactive controls and
//! publish the finished artifact for download.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::FlatlandResult;
use crate::session::Artifact;

/// Interactive controls owned by the surrounding UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlId {
    /// Starts a new session.
    Restart,
    /// Offers the finished recording for download.
    Download,
}

/// UI seam consumed by the session coordinator.
pub trait ControlPanel {
    /// Enable or disable a control.
    fn set_enabled(&mut self, control: ControlId, enabled: bool);

    /// Publish the finished artifact as `control`'s download target.
    fn set_download_target(&mut self, control: ControlId, artifact: &Artifact)
    -> FlatlandResult<()>;
}

/// Filesystem-backed panel: publishing the artifact saves it into a directory
/// under the artifact's suggested filename.
#[derive(Debug)]
pub struct DownloadDir {
    dir: PathBuf,
    enabled: HashMap<ControlId, bool>,
    saved: Option<PathBuf>,
}

impl DownloadDir {
    /// Panel saving published artifacts into `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            enabled: HashMap::new(),
            saved: None,
        }
    }

    /// Last observed enabled state of `control`, if it was ever set.
    pub fn is_enabled(&self, control: ControlId) -> Option<bool> {
        self.enabled.get(&control).copied()
    }

    /// Path the artifact was saved to, once published.
    pub fn saved_path(&self) -> Option<&Path> {
        self.saved.as_deref()
    }
}

impl ControlPanel for DownloadDir {
    fn set_enabled(&mut self, control: ControlId, enabled: bool) {
        self.enabled.insert(control, enabled);
    }

    fn set_download_target(
        &mut self,
        control: ControlId,
        artifact: &Artifact,
    ) -> FlatlandResult<()> {
        let _ = control;
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create download directory '{}'", self.dir.display()))?;
        let path = self.dir.join(&artifact.filename);
        std::fs::write(&path, &artifact.payload.data)
            .with_context(|| format!("write artifact '{}'", path.display()))?;
        self.saved = Some(path);
        Ok(())
    }
}
