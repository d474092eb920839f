use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use serde::Deserialize;
use slabscope::core::graph::criteria::{BondCriteria, parse_element_pair};
use slabscope::core::models::cell::{Axis, PeriodicBox};
use slabscope::core::topology::registry::TemplateRegistry;
use slabscope::engine::config::{AnalysisConfig, AnalysisConfigBuilder};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialSystemConfig {
    #[serde(rename = "box")]
    cell: Option<[f64; 3]>,
    axis: Option<Axis>,
    pbc_flip: Option<f64>,
    timesteps: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialAnalysisConfig {
    position_range: Option<[f64; 3]>,
    angle_range: Option<[f64; 3]>,
    reference_location: Option<f64>,
    top_surface: Option<bool>,
    surface_waters: Option<usize>,
    width_warning: Option<f64>,
    output_frequency: Option<usize>,
    reparse_interval: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialOutputConfig {
    directory: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialBondConfig {
    hbond_distance: Option<f64>,
    hbond_angle: Option<f64>,
    /// Covalent cutoff overrides keyed by element pair, e.g. `"O-H" = 1.25`.
    #[serde(default)]
    covalent: BTreeMap<String, f64>,
    #[serde(default)]
    interaction: BTreeMap<String, f64>,
}

/// The run configuration as read from TOML, before defaults and CLI flags apply.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialRunConfig {
    system: Option<PartialSystemConfig>,
    analysis: Option<PartialAnalysisConfig>,
    output: Option<PartialOutputConfig>,
    bonds: Option<PartialBondConfig>,
    templates: Option<PathBuf>,
}

impl PartialRunConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn merge_with_cli(mut self, args: &RunArgs) -> Result<AnalysisConfig> {
        self.apply_set_values(&args.set_values)?;

        let system = self.system.take().unwrap_or_default();
        let analysis = self.analysis.take().unwrap_or_default();
        let output = self.output.take().unwrap_or_default();

        let mut builder = AnalysisConfigBuilder::new();

        if let Some([x, y, z]) = system.cell {
            builder = builder.cell(PeriodicBox::new(x, y, z));
        }
        if let Some(axis) = system.axis {
            builder = builder.axis(axis);
        }
        if let Some(flip) = system.pbc_flip {
            builder = builder.pbc_flip(flip);
        }
        if let Some(timesteps) = args.timesteps.or(system.timesteps) {
            builder = builder.timesteps(timesteps);
        }

        if let Some([min, max, res]) = analysis.position_range {
            builder = builder.position_range(min, max, res);
        }
        if let Some([min, max, res]) = analysis.angle_range {
            builder = builder.angle_range(min, max, res);
        }
        if let Some(reference) = analysis.reference_location {
            builder = builder.reference_point(reference);
        }
        if let Some(top) = analysis.top_surface {
            builder = builder.top_surface(top);
        }
        if let Some(n) = analysis.surface_waters {
            builder = builder.surface_waters(n);
        }
        if let Some(width) = analysis.width_warning {
            builder = builder.width_warning(width);
        }
        if let Some(frequency) = analysis.output_frequency {
            builder = builder.output_frequency(frequency);
        }
        if let Some(interval) = analysis.reparse_interval {
            builder = builder.reparse_interval(interval);
        }

        if let Some(dir) = args.output_dir.clone().or(output.directory) {
            builder = builder.output_directory(dir);
        }

        if let Some(bonds) = self.bonds.take() {
            builder = builder.bonds(Self::merge_bonds(bonds)?);
        }

        if let Some(path) = args.templates.as_ref().or(self.templates.as_ref()) {
            debug!("Loading molecule templates from {:?}", path);
            let registry = TemplateRegistry::load(path).map_err(|e| CliError::FileParsing {
                path: path.clone(),
                source: e.into(),
            })?;
            builder = builder.templates(registry);
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    fn merge_bonds(partial: PartialBondConfig) -> Result<BondCriteria> {
        let mut criteria = BondCriteria::default();
        if let Some(distance) = partial.hbond_distance {
            criteria.hbond_distance = positive_length("bonds.hbond-distance", distance)?;
        }
        if let Some(angle) = partial.hbond_angle {
            if !(angle > 0.0 && angle <= 180.0) {
                return Err(CliError::Config(format!(
                    "bonds.hbond-angle must lie in (0, 180] degrees, got {angle}"
                )));
            }
            criteria.hbond_min_angle = angle;
        }
        let pair = |key: &str| {
            parse_element_pair(key).ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid element pair '{key}' in [bonds]. Expected e.g. \"O-H\"."
                ))
            })
        };
        for (key, cutoff) in &partial.covalent {
            let (a, b) = pair(key)?;
            criteria.set_covalent_cutoff(a, b, positive_length(key, *cutoff)?);
        }
        for (key, cutoff) in &partial.interaction {
            let (a, b) = pair(key)?;
            criteria.set_interaction_cutoff(a, b, positive_length(key, *cutoff)?);
        }
        Ok(criteria)
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value) = kv_pair.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid --set format: '{kv_pair}'. Expected KEY=VALUE."
                ))
            })?;
            let key = key.trim();
            let value = value.trim();

            match key {
                "system.box" => {
                    self.system.get_or_insert_with(Default::default).cell =
                        Some(parse_triple(key, value)?)
                }
                "system.axis" => {
                    self.system.get_or_insert_with(Default::default).axis =
                        Some(Axis::from_str(value).map_err(|_| {
                            CliError::Config(format!(
                                "Invalid axis for {key}: '{value}'. Expected x, y or z."
                            ))
                        })?)
                }
                "system.pbc-flip" => {
                    self.system.get_or_insert_with(Default::default).pbc_flip =
                        Some(parse(key, value)?)
                }
                "system.timesteps" => {
                    self.system.get_or_insert_with(Default::default).timesteps =
                        Some(parse(key, value)?)
                }
                "analysis.position-range" => {
                    self.analysis.get_or_insert_with(Default::default).position_range =
                        Some(parse_triple(key, value)?)
                }
                "analysis.angle-range" => {
                    self.analysis.get_or_insert_with(Default::default).angle_range =
                        Some(parse_triple(key, value)?)
                }
                "analysis.reference-location" => {
                    self.analysis.get_or_insert_with(Default::default).reference_location =
                        Some(parse(key, value)?)
                }
                "analysis.top-surface" => {
                    self.analysis.get_or_insert_with(Default::default).top_surface =
                        Some(parse(key, value)?)
                }
                "analysis.surface-waters" => {
                    self.analysis.get_or_insert_with(Default::default).surface_waters =
                        Some(parse(key, value)?)
                }
                "analysis.width-warning" => {
                    self.analysis.get_or_insert_with(Default::default).width_warning =
                        Some(parse(key, value)?)
                }
                "analysis.output-frequency" => {
                    self.analysis.get_or_insert_with(Default::default).output_frequency =
                        Some(parse(key, value)?)
                }
                "analysis.reparse-interval" => {
                    self.analysis.get_or_insert_with(Default::default).reparse_interval =
                        Some(parse(key, value)?)
                }
                "output.directory" => {
                    self.output.get_or_insert_with(Default::default).directory =
                        Some(PathBuf::from(value))
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{key}'"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!(
            "Invalid {} value for {key}: {value}",
            std::any::type_name::<T>()
        ))
    })
}

/// Parses `"a,b,c"` or `"[a, b, c]"` into three floats.
fn parse_triple(key: &str, value: &str) -> Result<[f64; 3]> {
    let inner = value.trim_start_matches('[').trim_end_matches(']');
    let parts = inner
        .split(',')
        .map(|part| parse::<f64>(key, part.trim()))
        .collect::<Result<Vec<_>>>()?;
    <[f64; 3]>::try_from(parts).map_err(|parts| {
        CliError::Config(format!(
            "Expected three comma-separated values for {key}, got {}",
            parts.len()
        ))
    })
}

fn positive_length(key: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(CliError::Config(format!(
            "Distance for '{key}' must be a positive finite number of Angstroms, got {value}"
        )))
    }
}
