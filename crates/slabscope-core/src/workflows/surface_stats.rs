use super::{not_set_up, open_sink};
use crate::core::io::sink::OutputSink;
use crate::core::models::molecule::MoleculeKind;
use crate::engine::analysis::{Analysis, FrameContext, StepOutcome};
use crate::engine::config::AnalysisConfig;
use crate::engine::error::AnalysisError;
use crate::engine::histogram::{Histogram1D, HistogramAgent, OutputTransform};
use tracing::info;

const OUTPUT_FILE: &str = "surface.dat";
const DENSITY_FILE: &str = "water-density.dat";

/// Writes the located surface of every frame as `timestep location width`, and
/// accumulates the water oxygen count against distance to that surface.
#[derive(Debug, Default)]
pub struct SurfaceStatistics {
    sink: Option<OutputSink>,
    density: Option<HistogramAgent<Histogram1D>>,
    frames: usize,
    location_sum: f64,
    width_sum: f64,
}

impl SurfaceStatistics {
    pub const NAME: &'static str = "surface-statistics";

    pub fn new() -> Self {
        Self::default()
    }

    /// Mean surface location and width over the frames seen so far.
    pub fn means(&self) -> Option<(f64, f64)> {
        if self.frames == 0 {
            return None;
        }
        let n = self.frames as f64;
        Some((self.location_sum / n, self.width_sum / n))
    }
}

impl Analysis for SurfaceStatistics {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Surface location and width at every timestep, and the water density profile"
    }

    fn setup(&mut self, config: &AnalysisConfig) -> Result<(), AnalysisError> {
        self.sink = Some(open_sink(config, OUTPUT_FILE)?);
        self.density = Some(HistogramAgent::new(
            Histogram1D::new(config.binning.position),
            open_sink(config, DENSITY_FILE)?,
            OutputTransform::Identity,
        ));
        Ok(())
    }

    fn analyze(&mut self, ctx: &FrameContext) -> Result<StepOutcome, AnalysisError> {
        let (Some(sink), Some(density)) = (self.sink.as_mut(), self.density.as_mut()) else {
            return Err(not_set_up(Self::NAME));
        };
        let surface = ctx.surface()?;
        for (_, water) in ctx.molecules(MoleculeKind::Water) {
            let oxygen = water
                .atom_by_role("O")
                .and_then(|id| ctx.system.atom(id))
                .map(|atom| atom.position);
            if let Some(position) = oxygen {
                density.histogram.record(ctx.distance_to_surface(&position)?);
            }
        }
        sink.append(&format!(
            "{:>8} {:12.4} {:10.4}\n",
            ctx.timestep, surface.location, surface.width
        ))?;
        self.frames += 1;
        self.location_sum += surface.location;
        self.width_sum += surface.width;
        Ok(StepOutcome::Continue)
    }

    fn flush(&mut self) -> Result<(), AnalysisError> {
        if let Some(sink) = self.sink.as_mut() {
            sink.flush()?;
        }
        if let Some(density) = self.density.as_mut() {
            density.flush()?;
        }
        Ok(())
    }

    fn post_process(&mut self) -> Result<(), AnalysisError> {
        if let Some((location, width)) = self.means() {
            info!(frames = self.frames, location, width, "Mean surface over the run");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::system::MolecularSystem;
    use crate::engine::fixtures;
    use crate::engine::histogram::Tabulate;
    use crate::engine::surface::SurfaceLocator;
    use nalgebra::Point3;

    #[test]
    fn one_row_per_frame_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixtures::config_builder(2)
            .output_directory(dir.path().to_path_buf())
            .build()
            .unwrap();
        let mut system = MolecularSystem::new(fixtures::slab_box());
        fixtures::water(&mut system, Point3::new(0.0, 0.0, 40.0), true);
        fixtures::water(&mut system, Point3::new(4.0, 0.0, 42.0), true);
        fixtures::assemble(&mut system, &config);
        let locator = SurfaceLocator::new(&config);

        let mut analysis = SurfaceStatistics::new();
        analysis.setup(&config).unwrap();
        for timestep in 0..3 {
            let ctx = FrameContext::new(&system, &config, &locator, timestep, 0);
            analysis.analyze(&ctx).unwrap();
        }
        analysis.flush().unwrap();

        let text = std::fs::read_to_string(dir.path().join(OUTPUT_FILE)).unwrap();
        let rows: Vec<Vec<f64>> = text
            .lines()
            .map(|l| l.split_whitespace().map(|v| v.parse().unwrap()).collect())
            .collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2][0], 2.0);
        assert_eq!(rows[0][1], 41.0);
        assert!((rows[0][2] - 2f64.sqrt()).abs() < 1e-4);
        assert_eq!(analysis.means().map(|m| m.0), Some(41.0));

        // Oxygens sit 1 Å below and above the mean: bins at -1 and 1 hold 3 each.
        let density = std::fs::read_to_string(dir.path().join(DENSITY_FILE)).unwrap();
        let populated: Vec<(f64, f64)> = density
            .lines()
            .map(|l| {
                let mut cols = l.split_whitespace().map(|v| v.parse::<f64>().unwrap());
                (cols.next().unwrap(), cols.next().unwrap())
            })
            .filter(|&(_, population)| population > 0.0)
            .collect();
        assert_eq!(populated.len(), 2);
        assert!(populated.iter().all(|&(_, population)| population == 3.0));
        assert_eq!(analysis.density.as_ref().unwrap().histogram.total_count(), 6);
    }

    #[test]
    fn missing_waters_fail_the_frame() {
        let config = fixtures::config(3);
        let system = MolecularSystem::new(fixtures::slab_box());
        let locator = SurfaceLocator::new(&config);
        let ctx = FrameContext::new(&system, &config, &locator, 0, 0);

        let mut analysis = SurfaceStatistics::new();
        analysis.setup(&config).unwrap();
        assert!(matches!(analysis.analyze(&ctx), Err(AnalysisError::Surface(_))));
    }
}
