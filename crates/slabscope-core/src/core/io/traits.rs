use crate::core::models::system::{ModelError, MolecularSystem};
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrajectoryError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed frame {frame} at line {line}: {kind}")]
    Malformed {
        frame: usize,
        line: usize,
        kind: FrameParseErrorKind,
    },
    #[error("Trajectory contains no frames")]
    Empty,
    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameParseErrorKind {
    #[error("Invalid atom count '{value}'")]
    InvalidCount { value: String },
    #[error("Frame declares {found} atoms but the trajectory has {expected}")]
    CountMismatch { expected: usize, found: usize },
    #[error("Expected element {expected} but found '{found}'")]
    ElementMismatch { expected: String, found: String },
    #[error("Invalid coordinate '{value}'")]
    InvalidFloat { value: String },
    #[error("Atom record needs an element and three coordinates")]
    MissingField,
    #[error("Frame ends before all atom records were read")]
    Truncated,
}

/// A sequential source of trajectory frames.
///
/// Implementors overwrite the positions of the atoms already present in the
/// system; they never add or remove atoms after the source has been opened.
pub trait FrameSource {
    /// Loads the next frame into `system`.
    ///
    /// # Return
    ///
    /// Returns `Ok(true)` when a frame was loaded and `Ok(false)` at the end of the
    /// trajectory.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be read or does not match the system.
    fn load_next(&mut self, system: &mut MolecularSystem) -> Result<bool, TrajectoryError>;

    /// Resets the cursor so that the next call to [`FrameSource::load_next`]
    /// yields the first frame again.
    fn rewind(&mut self) -> Result<(), TrajectoryError>;

    /// Number of frames loaded since opening or the last rewind.
    fn frames_read(&self) -> usize;
}
