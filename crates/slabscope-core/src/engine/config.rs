use super::histogram::{BinRange, grid_cells};
use crate::core::graph::criteria::BondCriteria;
use crate::core::models::cell::{Axis, AxisFrame, PeriodicBox};
use crate::core::topology::registry::TemplateRegistry;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_SURFACE_WATERS: usize = 70;
pub const DEFAULT_WIDTH_WARNING: f64 = 2.0;
pub const DEFAULT_OUTPUT_FREQUENCY: usize = 100;
pub const DEFAULT_REPARSE_INTERVAL: usize = 1;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    Invalid {
        parameter: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemConfig {
    pub cell: PeriodicBox,
    pub axis: Axis,
    pub pbc_flip: f64,
    /// Number of frames to analyse; `None` runs to the end of the trajectory.
    pub timesteps: Option<usize>,
}

impl SystemConfig {
    pub fn axis_frame(&self) -> AxisFrame {
        AxisFrame::new(self.axis, self.pbc_flip, self.cell.length(self.axis))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceConfig {
    pub reference_point: f64,
    pub top_surface: bool,
    pub surface_waters: usize,
    pub width_warning: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinningConfig {
    pub position: BinRange,
    pub angle: BinRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    /// Directory that receives every analysis file; `None` disables file output.
    pub directory: Option<PathBuf>,
    pub output_frequency: usize,
}

/// Immutable run parameters shared by every pipeline component.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub system: SystemConfig,
    pub surface: SurfaceConfig,
    pub binning: BinningConfig,
    pub output: OutputConfig,
    pub reparse_interval: usize,
    pub bonds: BondCriteria,
    pub templates: TemplateRegistry,
}

impl AnalysisConfig {
    pub fn output_path(&self, file_name: &str) -> Option<PathBuf> {
        self.output.directory.as_ref().map(|dir| dir.join(file_name))
    }

    /// Frames between two checkpoint flushes.
    pub fn checkpoint_interval(&self) -> usize {
        self.output.output_frequency * 10
    }
}

#[derive(Default)]
pub struct AnalysisConfigBuilder {
    cell: Option<PeriodicBox>,
    axis: Option<Axis>,
    pbc_flip: Option<f64>,
    timesteps: Option<usize>,
    reference_point: Option<f64>,
    top_surface: Option<bool>,
    surface_waters: Option<usize>,
    width_warning: Option<f64>,
    position_range: Option<(f64, f64, f64)>,
    angle_range: Option<(f64, f64, f64)>,
    output_directory: Option<PathBuf>,
    output_frequency: Option<usize>,
    reparse_interval: Option<usize>,
    bonds: Option<BondCriteria>,
    templates: Option<TemplateRegistry>,
}

impl AnalysisConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell(mut self, cell: PeriodicBox) -> Self {
        self.cell = Some(cell);
        self
    }
    pub fn axis(mut self, axis: Axis) -> Self {
        self.axis = Some(axis);
        self
    }
    pub fn pbc_flip(mut self, flip: f64) -> Self {
        self.pbc_flip = Some(flip);
        self
    }
    pub fn timesteps(mut self, timesteps: usize) -> Self {
        self.timesteps = Some(timesteps);
        self
    }
    pub fn reference_point(mut self, point: f64) -> Self {
        self.reference_point = Some(point);
        self
    }
    pub fn top_surface(mut self, top: bool) -> Self {
        self.top_surface = Some(top);
        self
    }
    pub fn surface_waters(mut self, n: usize) -> Self {
        self.surface_waters = Some(n);
        self
    }
    pub fn width_warning(mut self, width: f64) -> Self {
        self.width_warning = Some(width);
        self
    }
    pub fn position_range(mut self, min: f64, max: f64, resolution: f64) -> Self {
        self.position_range = Some((min, max, resolution));
        self
    }
    pub fn angle_range(mut self, min: f64, max: f64, resolution: f64) -> Self {
        self.angle_range = Some((min, max, resolution));
        self
    }
    pub fn output_directory(mut self, dir: PathBuf) -> Self {
        self.output_directory = Some(dir);
        self
    }
    pub fn output_frequency(mut self, frequency: usize) -> Self {
        self.output_frequency = Some(frequency);
        self
    }
    pub fn reparse_interval(mut self, interval: usize) -> Self {
        self.reparse_interval = Some(interval);
        self
    }
    pub fn bonds(mut self, criteria: BondCriteria) -> Self {
        self.bonds = Some(criteria);
        self
    }
    pub fn templates(mut self, registry: TemplateRegistry) -> Self {
        self.templates = Some(registry);
        self
    }

    pub fn build(self) -> Result<AnalysisConfig, ConfigError> {
        let at_least_one = |parameter: &'static str, value: usize| {
            if value == 0 {
                Err(ConfigError::Invalid {
                    parameter,
                    reason: "must be at least 1".to_string(),
                })
            } else {
                Ok(value)
            }
        };
        let bin_range = |parameter: &'static str, (min, max, res): (f64, f64, f64)| {
            BinRange::new(min, max, res).map_err(|e| ConfigError::Invalid {
                parameter,
                reason: e.to_string(),
            })
        };

        let cell = self.cell.ok_or(ConfigError::MissingParameter("box"))?;
        let axis = self.axis.unwrap_or_default();
        if cell.length(axis) <= 0.0 {
            return Err(ConfigError::Invalid {
                parameter: "box",
                reason: format!("box length along the {axis} axis must be positive"),
            });
        }
        if let Some(n) = self.timesteps {
            at_least_one("timesteps", n)?;
        }

        let system = SystemConfig {
            cell,
            axis,
            pbc_flip: self.pbc_flip.unwrap_or(0.0),
            timesteps: self.timesteps,
        };

        let width_warning = self.width_warning.unwrap_or(DEFAULT_WIDTH_WARNING);
        if !(width_warning > 0.0) {
            return Err(ConfigError::Invalid {
                parameter: "width_warning",
                reason: "must be positive".to_string(),
            });
        }
        let surface = SurfaceConfig {
            reference_point: self
                .reference_point
                .ok_or(ConfigError::MissingParameter("reference_location"))?,
            top_surface: self.top_surface.unwrap_or(true),
            surface_waters: at_least_one(
                "surface_waters",
                self.surface_waters.unwrap_or(DEFAULT_SURFACE_WATERS),
            )?,
            width_warning,
        };

        let binning = BinningConfig {
            position: bin_range(
                "position_range",
                self.position_range
                    .ok_or(ConfigError::MissingParameter("position_range"))?,
            )?,
            angle: bin_range(
                "angle_range",
                self.angle_range
                    .ok_or(ConfigError::MissingParameter("angle_range"))?,
            )?,
        };

        // Paired distance/angle histograms hold two grids of this size.
        grid_cells(&[2, binning.position.bins(), binning.angle.bins()]).map_err(|e| {
            ConfigError::Invalid {
                parameter: "position_range",
                reason: e.to_string(),
            }
        })?;

        let output = OutputConfig {
            directory: self.output_directory,
            output_frequency: at_least_one(
                "output_frequency",
                self.output_frequency.unwrap_or(DEFAULT_OUTPUT_FREQUENCY),
            )?,
        };

        Ok(AnalysisConfig {
            system,
            surface,
            binning,
            output,
            reparse_interval: at_least_one(
                "reparse_interval",
                self.reparse_interval.unwrap_or(DEFAULT_REPARSE_INTERVAL),
            )?,
            bonds: self.bonds.unwrap_or_default(),
            templates: self.templates.unwrap_or_default(),
        })
    }
}
