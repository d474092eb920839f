use super::config::AnalysisConfig;
use super::error::AnalysisError;
use super::frames::{FrameError, MolecularFrame};
use super::surface::{SurfaceError, SurfaceEstimate, SurfaceLocator};
use crate::core::models::cell::AxisFrame;
use crate::core::models::ids::MoleculeId;
use crate::core::models::molecule::{Molecule, MoleculeKind};
use crate::core::models::system::MolecularSystem;
use nalgebra::{Point3, Vector3};
use std::cell::OnceCell;

/// What the driver should do after an analysis has seen a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepOutcome {
    #[default]
    Continue,
    /// Restart from the first frame for another pass.
    Rewind,
}

/// Everything an analysis may read while processing one frame.
///
/// The surface is located lazily, at most once per frame, on the first call to
/// [`FrameContext::surface`].
pub struct FrameContext<'a> {
    pub system: &'a MolecularSystem,
    pub config: &'a AnalysisConfig,
    pub timestep: usize,
    /// Zero for the first pass, incremented on every rewind.
    pub pass: usize,
    locator: &'a SurfaceLocator,
    surface: OnceCell<Result<SurfaceEstimate, SurfaceError>>,
}

impl<'a> FrameContext<'a> {
    pub fn new(
        system: &'a MolecularSystem,
        config: &'a AnalysisConfig,
        locator: &'a SurfaceLocator,
        timestep: usize,
        pass: usize,
    ) -> Self {
        Self {
            system,
            config,
            timestep,
            pass,
            locator,
            surface: OnceCell::new(),
        }
    }

    pub fn surface(&self) -> Result<&SurfaceEstimate, SurfaceError> {
        self.surface
            .get_or_init(|| self.locator.locate(self.system))
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn axis_frame(&self) -> &AxisFrame {
        self.locator.axis_frame()
    }

    pub fn top_surface(&self) -> bool {
        self.locator.top_surface()
    }

    /// Unit vector along the reference axis pointing out of the liquid.
    pub fn surface_normal(&self) -> Vector3<f64> {
        let axis = self.axis_frame().unit_vector();
        if self.top_surface() { axis } else { -axis }
    }

    /// Unwrapped position of `point` along the reference axis.
    pub fn position(&self, point: &Point3<f64>) -> f64 {
        self.axis_frame().position(point)
    }

    pub fn distance_to_surface(&self, point: &Point3<f64>) -> Result<f64, SurfaceError> {
        let position = self.position(point);
        Ok(self.surface()?.distance_to_surface(position))
    }

    pub fn molecules(&self, kind: MoleculeKind) -> impl Iterator<Item = (MoleculeId, &'a Molecule)> {
        self.system.molecules_of_kind(kind)
    }

    /// Frames of every molecule of `kind`, built from the current positions.
    pub fn frames(
        &self,
        kind: MoleculeKind,
    ) -> impl Iterator<Item = Result<(MoleculeId, MolecularFrame), FrameError>> + 'a {
        let system = self.system;
        system
            .molecules_of_kind(kind)
            .map(move |(id, molecule)| MolecularFrame::build(system, molecule).map(|f| (id, f)))
    }
}

/// A measurement run over every frame of a trajectory.
///
/// The driver calls `setup` once before the first frame and `analyze` once per
/// frame. `flush` runs at every checkpoint and once more at the end of the run,
/// followed by a single `post_process`.
pub trait Analysis {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn setup(&mut self, config: &AnalysisConfig) -> Result<(), AnalysisError>;

    fn analyze(&mut self, ctx: &FrameContext) -> Result<StepOutcome, AnalysisError>;

    fn flush(&mut self) -> Result<(), AnalysisError>;

    fn post_process(&mut self) -> Result<(), AnalysisError> {
        Ok(())
    }
}
