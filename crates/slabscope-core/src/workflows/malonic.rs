use super::{degrees, not_set_up, open_sink};
use crate::core::models::molecule::{MalonicState, MoleculeKind};
use crate::core::utils::geometry::{tilt_degrees, twist_degrees};
use crate::engine::analysis::{Analysis, FrameContext, StepOutcome};
use crate::engine::config::AnalysisConfig;
use crate::engine::error::AnalysisError;
use crate::engine::frames::{MalonicFrame, MolecularFrame};
use crate::engine::histogram::{Histogram2D, HistogramAgent, OutputTransform};
use nalgebra::Vector3;

const THETA_PHI_FILE: &str = "malonic-theta-phi.dat";
const PSI_FILE: &str = "malonic-psi.dat";
const ANGLE_RESOLUTION: f64 = 1.0;

const STATES: [MalonicState; 3] = [
    MalonicState::Acid,
    MalonicState::Malonate,
    MalonicState::Dimalonate,
];

#[derive(Debug)]
struct BackboneHistograms {
    theta_phi: HistogramAgent<Histogram2D>,
    psi: HistogramAgent<Histogram2D>,
}

/// Orientation of the malonic C1-CM-C2 backbone and the twist of its carboxyl
/// groups, for every protonation state.
///
/// θ is the angle of the backbone bisector with the surface normal and φ the
/// rotation of the CM-C1 bond about that bisector, folded into [0, 90] degrees.
/// The θ-φ table is written with the sin θ solid-angle correction.
#[derive(Debug, Default)]
pub struct MalonicBackbone {
    histograms: Option<BackboneHistograms>,
}

impl MalonicBackbone {
    pub const NAME: &'static str = "malonic-backbone";

    pub fn new() -> Self {
        Self::default()
    }
}

/// (θ, φ) in degrees of `frame` against `normal`.
fn theta_phi(frame: &MalonicFrame, normal: &Vector3<f64>) -> (f64, f64) {
    let theta = tilt_degrees(&frame.bisector, normal);
    let phi = twist_degrees(normal, &frame.bisector, &frame.cm_c1).abs();
    let phi = if phi > 90.0 { 180.0 - phi } else { phi };
    (theta, phi)
}

impl Analysis for MalonicBackbone {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Malonic acid backbone theta-phi orientation and carboxyl psi dihedrals"
    }

    fn setup(&mut self, config: &AnalysisConfig) -> Result<(), AnalysisError> {
        let half_turn = degrees(180.0, ANGLE_RESOLUTION)?;
        let quarter_turn = degrees(90.0, ANGLE_RESOLUTION)?;
        self.histograms = Some(BackboneHistograms {
            theta_phi: HistogramAgent::new(
                Histogram2D::new(half_turn, quarter_turn)?,
                open_sink(config, THETA_PHI_FILE)?,
                OutputTransform::DivideBySinFirst,
            ),
            psi: HistogramAgent::new(
                Histogram2D::new(half_turn, half_turn)?,
                open_sink(config, PSI_FILE)?,
                OutputTransform::Identity,
            ),
        });
        Ok(())
    }

    fn analyze(&mut self, ctx: &FrameContext) -> Result<StepOutcome, AnalysisError> {
        let histograms = self.histograms.as_mut().ok_or_else(|| not_set_up(Self::NAME))?;
        let normal = ctx.surface_normal();

        for state in STATES {
            for frame in ctx.frames(MoleculeKind::Malonic(state)) {
                let (_, frame) = frame?;
                let MolecularFrame::Malonic(malonic) = frame else {
                    continue;
                };
                let (theta, phi) = theta_phi(&malonic, &normal);
                histograms.theta_phi.histogram.record(theta, phi);
                histograms.psi.histogram.record(
                    malonic.psi1.to_degrees().abs(),
                    malonic.psi2.to_degrees().abs(),
                );
            }
        }
        Ok(StepOutcome::Continue)
    }

    fn flush(&mut self) -> Result<(), AnalysisError> {
        if let Some(h) = self.histograms.as_mut() {
            h.theta_phi.flush()?;
            h.psi.flush()?;
        }
        Ok(())
    }
}
