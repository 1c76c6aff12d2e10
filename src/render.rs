//! Interface to the external rendering engine.
//!
//! The engine itself is an external collaborator: it receives the final
//! directive sequence and produces pixels or vector files. This crate only
//! defines the calling contract plus a recording implementation used by
//! tests and the CLI's dump mode.

use std::cell::RefCell;
use std::path::PathBuf;

use crate::directive::Directive;
use crate::error::RenderError;

/// Blocking, non-reentrant execution of a directive sequence.
pub trait Renderer {
    fn execute(&self, directives: &[Directive]) -> Result<(), RenderError>;
}

/// Renderer that records every sequence it is asked to execute.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    executed: RefCell<Vec<Vec<Directive>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// All sequences executed so far, in call order.
    pub fn executed(&self) -> Vec<Vec<Directive>> {
        self.executed.borrow().clone()
    }

    /// The one and only executed sequence; panics if there was not exactly
    /// one call (test helper).
    pub fn single_sequence(&self) -> Vec<Directive> {
        let executed = self.executed.borrow();
        assert_eq!(executed.len(), 1, "expected exactly one render call");
        executed[0].clone()
    }
}

impl Renderer for RecordingRenderer {
    fn execute(&self, directives: &[Directive]) -> Result<(), RenderError> {
        self.executed.borrow_mut().push(directives.to_vec());
        Ok(())
    }
}

/// Renderer that always fails, for exercising the error path.
#[derive(Debug, Default)]
pub struct FailingRenderer;

impl Renderer for FailingRenderer {
    fn execute(&self, _directives: &[Directive]) -> Result<(), RenderError> {
        Err(RenderError("simulated engine failure".to_string()))
    }
}

/// Kind of artifact a render produced, inferred from the destination
/// extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Vector,
    Raster,
}

impl ArtifactKind {
    pub fn from_extension(ext: &str) -> ArtifactKind {
        match ext {
            "svg" | "pdf" | "ps" => ArtifactKind::Vector,
            _ => ArtifactKind::Raster,
        }
    }
}

/// Displayable wrapper around the rendered file, carrying the requested
/// pixel width as metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotArtifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub width: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::DirectiveType;

    #[test]
    fn recording_renderer_captures_sequences() {
        let renderer = RecordingRenderer::new();
        let seq = vec![Directive::new(DirectiveType::OutputPage)];
        renderer.execute(&seq).unwrap();
        assert_eq!(renderer.single_sequence(), seq);
    }

    #[test]
    fn artifact_kind_by_extension() {
        assert_eq!(ArtifactKind::from_extension("svg"), ArtifactKind::Vector);
        assert_eq!(ArtifactKind::from_extension("png"), ArtifactKind::Raster);
        assert_eq!(ArtifactKind::from_extension("jpg"), ArtifactKind::Raster);
    }
}
