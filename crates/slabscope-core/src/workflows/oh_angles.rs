use super::{not_set_up, open_sink};
use crate::core::models::molecule::MoleculeKind;
use crate::engine::analysis::{Analysis, FrameContext, StepOutcome};
use crate::engine::config::AnalysisConfig;
use crate::engine::error::AnalysisError;
use crate::engine::frames::MolecularFrame;
use crate::engine::histogram::{HistogramAgent, OutputTransform, PairedHistogram2D};
use tracing::debug;

const OUTPUT_FILE: &str = "oh-angles.dat";

/// Angles of both O-H bonds of every water with the surface normal.
///
/// The bond with the larger |cos| goes into the first histogram, the other into
/// the second.
#[derive(Debug, Default)]
pub struct OhAngleAnalysis {
    histogram: Option<HistogramAgent<PairedHistogram2D>>,
}

impl OhAngleAnalysis {
    pub const NAME: &'static str = "water-oh-angles";

    pub fn new() -> Self {
        Self::default()
    }
}

impl Analysis for OhAngleAnalysis {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Cosines of both water O-H bonds with the surface normal against distance to the surface"
    }

    fn setup(&mut self, config: &AnalysisConfig) -> Result<(), AnalysisError> {
        let histogram = PairedHistogram2D::new(config.binning.position, config.binning.angle)?;
        self.histogram = Some(HistogramAgent::new(
            histogram,
            open_sink(config, OUTPUT_FILE)?,
            OutputTransform::Identity,
        ));
        debug!(file = OUTPUT_FILE, "O-H angle histograms ready");
        Ok(())
    }

    fn analyze(&mut self, ctx: &FrameContext) -> Result<StepOutcome, AnalysisError> {
        let agent = self.histogram.as_mut().ok_or_else(|| not_set_up(Self::NAME))?;
        let normal = ctx.surface_normal();

        for frame in ctx.frames(MoleculeKind::Water) {
            let (_, frame) = frame?;
            let MolecularFrame::Water(water) = frame else {
                continue;
            };
            let distance = ctx.distance_to_surface(&water.o)?;
            let (major, minor) = water.oh_cosines(&normal);
            agent.histogram.first.record(distance, major);
            agent.histogram.second.record(distance, minor);
        }
        Ok(StepOutcome::Continue)
    }

    fn flush(&mut self) -> Result<(), AnalysisError> {
        if let Some(agent) = self.histogram.as_mut() {
            agent.flush()?;
        }
        Ok(())
    }
}
