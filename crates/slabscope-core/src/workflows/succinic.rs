use super::{degrees, not_set_up, open_sink};
use crate::core::models::molecule::MoleculeKind;
use crate::engine::analysis::{Analysis, FrameContext, StepOutcome};
use crate::engine::config::AnalysisConfig;
use crate::engine::error::AnalysisError;
use crate::engine::frames::{MolecularFrame, SuccinicFrame};
use crate::engine::histogram::{
    Histogram2D, HistogramAgent, Multi2DHistogram, Multi2DHistogramAgent, OutputTransform,
};
use tracing::debug;

const DIHEDRAL_FILE: &str = "dihedrals.v.distance.dat";
const DIHEDRAL_RESOLUTION: f64 = 1.0;
const TILT_TWIST_RESOLUTION: f64 = 4.0;

/// Succinic acid frames of the current step, each with the distance of its
/// centre of mass to the surface.
fn succinic_frames(ctx: &FrameContext) -> Result<Vec<(f64, SuccinicFrame)>, AnalysisError> {
    let mut frames = Vec::new();
    for frame in ctx.frames(MoleculeKind::SuccinicAcid) {
        let (_, frame) = frame?;
        if let MolecularFrame::Succinic(succinic) = frame {
            let distance = ctx.distance_to_surface(&succinic.center_of_mass)?;
            frames.push((distance, succinic));
        }
    }
    Ok(frames)
}

/// |C1-C2-C3-C4| dihedral of every succinic acid against the distance of its
/// centre of mass to the surface.
///
/// Dihedrals are folded into [0, 180] degrees since the chain is symmetric.
#[derive(Debug, Default)]
pub struct SuccinicDihedrals {
    histogram: Option<HistogramAgent<Histogram2D>>,
}

impl SuccinicDihedrals {
    pub const NAME: &'static str = "succinic-dihedrals";

    pub fn new() -> Self {
        Self::default()
    }
}

impl Analysis for SuccinicDihedrals {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Succinic acid backbone dihedral against distance to the surface"
    }

    fn setup(&mut self, config: &AnalysisConfig) -> Result<(), AnalysisError> {
        let histogram = Histogram2D::new(
            config.binning.position,
            degrees(180.0, DIHEDRAL_RESOLUTION)?,
        )?;
        self.histogram = Some(HistogramAgent::new(
            histogram,
            open_sink(config, DIHEDRAL_FILE)?,
            OutputTransform::Identity,
        ));
        Ok(())
    }

    fn analyze(&mut self, ctx: &FrameContext) -> Result<StepOutcome, AnalysisError> {
        let agent = self.histogram.as_mut().ok_or_else(|| not_set_up(Self::NAME))?;
        for (distance, frame) in succinic_frames(ctx)? {
            agent
                .histogram
                .record(distance, frame.backbone_dihedral.to_degrees().abs());
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

/// Tilt of each carboxyl O-C-O bisector with the surface normal and |twist| of
/// its C=O bond about that bisector, with one histogram per slab of distance to
/// the surface.
#[derive(Debug, Default)]
pub struct SuccinicTiltTwist {
    histograms: Option<Multi2DHistogramAgent>,
}

impl SuccinicTiltTwist {
    pub const NAME: &'static str = "succinic-tilt-twist";

    pub fn new() -> Self {
        Self::default()
    }

    /// Output file of the slice whose lower edge is `position`.
    pub fn slice_file(position: f64) -> String {
        format!("carbonyl-tilt-twist.{position}.dat")
    }
}

impl Analysis for SuccinicTiltTwist {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Succinic acid carboxyl tilt and twist, one histogram per depth slice"
    }

    fn setup(&mut self, config: &AnalysisConfig) -> Result<(), AnalysisError> {
        let slices = config.binning.position;
        let angle = degrees(180.0, TILT_TWIST_RESOLUTION)?;
        let histogram = Multi2DHistogram::new(slices, angle, angle)?;
        let sinks = (0..slices.bins())
            .map(|i| open_sink(config, &Self::slice_file(slices.lower_edge(i))))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(slices = sinks.len(), "Tilt-twist slices ready");
        self.histograms = Some(Multi2DHistogramAgent::new(
            histogram,
            sinks,
            OutputTransform::Identity,
        ));
        Ok(())
    }

    fn analyze(&mut self, ctx: &FrameContext) -> Result<StepOutcome, AnalysisError> {
        let agent = self.histograms.as_mut().ok_or_else(|| not_set_up(Self::NAME))?;
        let normal = ctx.surface_normal();
        for (distance, frame) in succinic_frames(ctx)? {
            for carboxyl in &frame.carboxyls {
                agent.histogram.record(
                    distance,
                    carboxyl.tilt(&normal),
                    carboxyl.twist(&normal).abs(),
                );
            }
        }
        Ok(StepOutcome::Continue)
    }

    fn flush(&mut self) -> Result<(), AnalysisError> {
        if let Some(agent) = self.histograms.as_mut() {
            agent.flush()?;
        }
        Ok(())
    }
}
