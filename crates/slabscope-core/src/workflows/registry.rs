use super::adsorption::So2Adsorption;
use super::malonic::MalonicBackbone;
use super::oh_angles::OhAngleAnalysis;
use super::orientation::OrientationAnalysis;
use super::succinic::{SuccinicDihedrals, SuccinicTiltTwist};
use super::surface_stats::SurfaceStatistics;
use crate::engine::analysis::Analysis;
use crate::engine::error::EngineError;

pub type AnalysisFactory = fn() -> Box<dyn Analysis>;

/// A built-in analysis, addressable by name.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisEntry {
    pub name: &'static str,
    factory: AnalysisFactory,
}

impl AnalysisEntry {
    /// A fresh, not yet set up instance.
    pub fn create(&self) -> Box<dyn Analysis> {
        (self.factory)()
    }

    pub fn description(&self) -> &'static str {
        self.create().description()
    }
}

static BUILTIN: [AnalysisEntry; 8] = [
    AnalysisEntry {
        name: OrientationAnalysis::WATER_NAME,
        factory: || Box::new(OrientationAnalysis::water()),
    },
    AnalysisEntry {
        name: OhAngleAnalysis::NAME,
        factory: || Box::new(OhAngleAnalysis::new()),
    },
    AnalysisEntry {
        name: OrientationAnalysis::SO2_NAME,
        factory: || Box::new(OrientationAnalysis::sulfur_dioxide()),
    },
    AnalysisEntry {
        name: SurfaceStatistics::NAME,
        factory: || Box::new(SurfaceStatistics::new()),
    },
    AnalysisEntry {
        name: SuccinicDihedrals::NAME,
        factory: || Box::new(SuccinicDihedrals::new()),
    },
    AnalysisEntry {
        name: SuccinicTiltTwist::NAME,
        factory: || Box::new(SuccinicTiltTwist::new()),
    },
    AnalysisEntry {
        name: MalonicBackbone::NAME,
        factory: || Box::new(MalonicBackbone::new()),
    },
    AnalysisEntry {
        name: So2Adsorption::NAME,
        factory: || Box::new(So2Adsorption::new()),
    },
];

/// Every built-in analysis, in listing order.
pub fn entries() -> &'static [AnalysisEntry] {
    &BUILTIN
}

pub fn lookup(name: &str) -> Option<&'static AnalysisEntry> {
    BUILTIN.iter().find(|entry| entry.name == name)
}

/// Instantiates the analysis registered as `name`.
///
/// # Errors
///
/// Returns [`EngineError::UnknownAnalysis`] listing the valid names.
pub fn create(name: &str) -> Result<Box<dyn Analysis>, EngineError> {
    lookup(name)
        .map(AnalysisEntry::create)
        .ok_or_else(|| EngineError::UnknownAnalysis {
            name: name.to_string(),
            available: BUILTIN.iter().map(|entry| entry.name).collect::<Vec<_>>().join(", "),
        })
}
