use super::{not_set_up, open_sink};
use crate::core::models::molecule::MoleculeKind;
use crate::core::utils::geometry::cos_angle;
use crate::engine::analysis::{Analysis, FrameContext, StepOutcome};
use crate::engine::config::AnalysisConfig;
use crate::engine::error::AnalysisError;
use crate::engine::frames::MolecularFrame;
use crate::engine::histogram::{Histogram2D, HistogramAgent, OutputTransform, Tabulate};
use nalgebra::Vector3;
use tracing::{debug, info};

/// The molecule kind whose orientation an [`OrientationAnalysis`] follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationTarget {
    Water,
    SulfurDioxide,
}

impl OrientationTarget {
    fn kind(self) -> MoleculeKind {
        match self {
            OrientationTarget::Water => MoleculeKind::Water,
            OrientationTarget::SulfurDioxide => MoleculeKind::SulfurDioxide,
        }
    }

    fn files(self) -> (&'static str, &'static str) {
        match self {
            OrientationTarget::Water => ("alpha.dat", "beta.dat"),
            OrientationTarget::SulfurDioxide => ("so2-alpha.dat", "so2-beta.dat"),
        }
    }
}

#[derive(Debug)]
struct OrientationHistograms {
    /// Distance against the cosine of the bisector with the surface normal.
    alpha: HistogramAgent<Histogram2D>,
    /// Distance against |cos| of the molecular plane normal with the axis.
    beta: HistogramAgent<Histogram2D>,
}

/// Bisector and plane-normal orientation of triatomic molecules as a function of
/// their distance to the surface.
#[derive(Debug)]
pub struct OrientationAnalysis {
    target: OrientationTarget,
    histograms: Option<OrientationHistograms>,
}

impl OrientationAnalysis {
    pub const WATER_NAME: &'static str = "water-orientation";
    pub const SO2_NAME: &'static str = "so2-orientation";

    pub fn water() -> Self {
        Self::new(OrientationTarget::Water)
    }

    pub fn sulfur_dioxide() -> Self {
        Self::new(OrientationTarget::SulfurDioxide)
    }

    pub fn new(target: OrientationTarget) -> Self {
        Self {
            target,
            histograms: None,
        }
    }

    pub fn target(&self) -> OrientationTarget {
        self.target
    }
}

/// Bisector and plane normal of a frame, for the kinds that have both.
fn orientation_vectors(frame: &MolecularFrame) -> Option<(Vector3<f64>, Vector3<f64>)> {
    match frame {
        MolecularFrame::Water(f) => Some((f.bisector, f.normal)),
        MolecularFrame::SulfurDioxide(f) => Some((f.bisector, f.normal)),
        _ => None,
    }
}

impl Analysis for OrientationAnalysis {
    fn name(&self) -> &'static str {
        match self.target {
            OrientationTarget::Water => Self::WATER_NAME,
            OrientationTarget::SulfurDioxide => Self::SO2_NAME,
        }
    }

    fn description(&self) -> &'static str {
        match self.target {
            OrientationTarget::Water => {
                "Water bisector and plane-normal angles against distance to the surface"
            }
            OrientationTarget::SulfurDioxide => {
                "SO2 bisector and plane-normal angles against distance to the surface"
            }
        }
    }

    fn setup(&mut self, config: &AnalysisConfig) -> Result<(), AnalysisError> {
        let (alpha_file, beta_file) = self.target.files();
        let grid = || Histogram2D::new(config.binning.position, config.binning.angle);
        self.histograms = Some(OrientationHistograms {
            alpha: HistogramAgent::new(grid()?, open_sink(config, alpha_file)?, OutputTransform::Identity),
            beta: HistogramAgent::new(grid()?, open_sink(config, beta_file)?, OutputTransform::Identity),
        });
        debug!(analysis = self.name(), alpha_file, beta_file, "Orientation histograms ready");
        Ok(())
    }

    fn analyze(&mut self, ctx: &FrameContext) -> Result<StepOutcome, AnalysisError> {
        let name = self.name();
        let histograms = self.histograms.as_mut().ok_or_else(|| not_set_up(name))?;
        let normal = ctx.surface_normal();
        let axis = ctx.axis_frame().unit_vector();

        for frame in ctx.frames(self.target.kind()) {
            let (_, frame) = frame?;
            let Some((bisector, plane)) = orientation_vectors(&frame) else {
                continue;
            };
            let distance = ctx.distance_to_surface(&frame.reference_point())?;
            histograms
                .alpha
                .histogram
                .record(distance, cos_angle(&bisector, &normal));
            histograms
                .beta
                .histogram
                .record(distance, cos_angle(&plane, &axis).abs());
        }
        Ok(StepOutcome::Continue)
    }

    fn flush(&mut self) -> Result<(), AnalysisError> {
        if let Some(h) = self.histograms.as_mut() {
            h.alpha.flush()?;
            h.beta.flush()?;
        }
        Ok(())
    }

    fn post_process(&mut self) -> Result<(), AnalysisError> {
        if let Some(h) = &self.histograms {
            info!(
                analysis = self.name(),
                molecules = h.alpha.histogram.total_count(),
                "Orientation analysis complete"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::system::MolecularSystem;
    use crate::engine::fixtures;
    use crate::engine::surface::SurfaceLocator;
    use nalgebra::Point3;

    fn slab_with_waters() -> MolecularSystem {
        let mut system = MolecularSystem::new(fixtures::slab_box());
        fixtures::water(&mut system, Point3::new(0.0, 0.0, 40.0), true);
        fixtures::water(&mut system, Point3::new(4.0, 0.0, 42.0), true);
        system
    }

    #[test]
    fn water_bisectors_are_binned_by_distance() {
        let config = fixtures::config(2);
        let mut system = slab_with_waters();
        fixtures::assemble(&mut system, &config);
        let locator = SurfaceLocator::new(&config);
        let ctx = FrameContext::new(&system, &config, &locator, 0, 0);

        let mut analysis = OrientationAnalysis::water();
        analysis.setup(&config).unwrap();
        assert_eq!(analysis.analyze(&ctx).unwrap(), StepOutcome::Continue);

        let h = analysis.histograms.as_ref().unwrap();
        assert_eq!(h.alpha.histogram.total_count(), 2);
        assert_eq!(h.alpha.histogram.population(1.0, 1.0), 1);
        assert_eq!(h.alpha.histogram.population(-1.0, 1.0), 1);
        assert_eq!(h.beta.histogram.population(1.0, 0.0), 1);
    }

    #[test]
    fn sulfur_dioxide_is_followed_without_touching_waters() {
        let config = fixtures::config(2);
        let mut system = slab_with_waters();
        fixtures::sulfur_dioxide(&mut system, Point3::new(10.0, 10.0, 45.0));
        fixtures::assemble(&mut system, &config);
        let locator = SurfaceLocator::new(&config);
        let ctx = FrameContext::new(&system, &config, &locator, 0, 0);

        let mut analysis = OrientationAnalysis::sulfur_dioxide();
        analysis.setup(&config).unwrap();
        analysis.analyze(&ctx).unwrap();

        let h = analysis.histograms.as_ref().unwrap();
        assert_eq!(h.alpha.histogram.total_count(), 1);
        assert_eq!(h.alpha.histogram.population(4.0, 0.0), 1);
    }

    #[test]
    fn analyze_before_setup_is_rejected() {
        let config = fixtures::config(2);
        let system = MolecularSystem::new(fixtures::slab_box());
        let locator = SurfaceLocator::new(&config);
        let ctx = FrameContext::new(&system, &config, &locator, 0, 0);
        let mut analysis = OrientationAnalysis::water();
        assert!(matches!(analysis.analyze(&ctx), Err(AnalysisError::Invalid(_))));
    }

    #[test]
    fn flush_writes_both_tables() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixtures::config_builder(2)
            .output_directory(dir.path().to_path_buf())
            .build()
            .unwrap();
        let mut system = slab_with_waters();
        fixtures::assemble(&mut system, &config);
        let locator = SurfaceLocator::new(&config);
        let ctx = FrameContext::new(&system, &config, &locator, 0, 0);

        let mut analysis = OrientationAnalysis::water();
        analysis.setup(&config).unwrap();
        analysis.analyze(&ctx).unwrap();
        analysis.flush().unwrap();

        let alpha = std::fs::read_to_string(dir.path().join("alpha.dat")).unwrap();
        let beta = std::fs::read_to_string(dir.path().join("beta.dat")).unwrap();
        assert_eq!(alpha.lines().count(), 20 * 20);
        assert_eq!(beta.lines().count(), 20 * 20);
    }
}
