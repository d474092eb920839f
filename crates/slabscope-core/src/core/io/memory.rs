use super::traits::{FrameSource, TrajectoryError};
use crate::core::models::system::MolecularSystem;
use nalgebra::Point3;

/// A frame source over position sets held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTrajectory {
    frames: Vec<Vec<Point3<f64>>>,
    cursor: usize,
}

impl InMemoryTrajectory {
    pub fn new(frames: Vec<Vec<Point3<f64>>>) -> Self {
        Self { frames, cursor: 0 }
    }

    pub fn push_frame(&mut self, positions: Vec<Point3<f64>>) {
        self.frames.push(positions);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for InMemoryTrajectory {
    fn load_next(&mut self, system: &mut MolecularSystem) -> Result<bool, TrajectoryError> {
        let Some(positions) = self.frames.get(self.cursor) else {
            return Ok(false);
        };
        system.set_positions(positions)?;
        self.cursor += 1;
        Ok(true)
    }

    fn rewind(&mut self) -> Result<(), TrajectoryError> {
        self.cursor = 0;
        Ok(())
    }

    fn frames_read(&self) -> usize {
        self.cursor
    }
}
