//! PDF export through a short-lived temp file.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::document::compiler::{self, CompileError};
use crate::document::render::{DocumentRenderer, RenderError};

/// Download name of the exported artifact.
pub const EXPORT_FILE_NAME: &str = "resume.pdf";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("temporary export file failed: {0}")]
    Io(#[from] io::Error),
}

/// Tracks live export handles.
#[derive(Debug, Clone, Default)]
pub struct ExportSlots {
    live: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ExportSlots {
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Highest number of handles ever alive at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn allocate(&self) -> Result<ExportHandle, ExportError> {
        let file = tempfile::Builder::new()
            .prefix("resume-")
            .suffix(".pdf")
            .tempfile()?;
        let now_live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_live, Ordering::SeqCst);
        Ok(ExportHandle {
            file,
            live: Arc::clone(&self.live),
        })
    }
}

/// A temp file holding one export. Deleted and released on drop.
#[derive(Debug)]
pub struct ExportHandle {
    file: NamedTempFile,
    live: Arc<AtomicUsize>,
}

impl ExportHandle {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<(), ExportError> {
        let file = self.file.as_file_mut();
        file.write_all(bytes)?;
        file.flush()?;
        Ok(())
    }

    /// Reads the artifact back and releases the handle.
    pub fn deliver(mut self) -> Result<Vec<u8>, ExportError> {
        let file = self.file.as_file_mut();
        file.seek(SeekFrom::Start(0))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

impl Drop for ExportHandle {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        debug!(path = %self.file.path().display(), "Export handle released");
    }
}

/// Compiles `source` afresh, renders it, and passes the bytes through a
/// temp file. Every exit path releases the handle.
pub fn export_document(
    source: &str,
    renderer: &DocumentRenderer,
    slots: &ExportSlots,
) -> Result<Vec<u8>, ExportError> {
    let doc = compiler::compile(source)?;
    let pdf = renderer.render_to_artifact(&doc)?;
    let mut handle = slots.allocate()?;
    handle.write(&pdf)?;
    handle.deliver()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::templates::DEFAULT_TEMPLATE;

    #[test]
    fn test_export_produces_pdf_and_releases_handle() {
        let slots = ExportSlots::default();
        let bytes = export_document(DEFAULT_TEMPLATE, &DocumentRenderer::new(), &slots).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(slots.live(), 0);
    }

    #[test]
    fn test_successive_exports_hold_one_handle_at_most() {
        let slots = ExportSlots::default();
        let renderer = DocumentRenderer::new();
        export_document(DEFAULT_TEMPLATE, &renderer, &slots).unwrap();
        export_document(DEFAULT_TEMPLATE, &renderer, &slots).unwrap();
        assert_eq!(slots.peak(), 1);
        assert_eq!(slots.live(), 0);
    }

    #[test]
    fn test_failed_export_allocates_nothing() {
        let slots = ExportSlots::default();
        let err = export_document("const x = 1;", &DocumentRenderer::new(), &slots).unwrap_err();
        assert!(matches!(err, ExportError::Compile(CompileError::MissingRoot(_))));
        assert_eq!(slots.peak(), 0);
    }

    #[test]
    fn test_dropping_handle_removes_file() {
        let slots = ExportSlots::default();
        let mut handle = slots.allocate().unwrap();
        handle.write(b"%PDF-1.3").unwrap();
        let path = handle.path().to_path_buf();
        assert!(path.exists());
        drop(handle);
        assert!(!path.exists());
        assert_eq!(slots.live(), 0);
    }
}
