use super::config::{AnalysisConfig, SurfaceConfig};
use crate::core::models::cell::AxisFrame;
use crate::core::models::molecule::MoleculeKind;
use crate::core::models::system::MolecularSystem;
use itertools::Itertools;
use thiserror::Error;
use tracing::{trace, warn};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SurfaceError {
    #[error(
        "Surface needs {required} water molecules on the tracked side of the reference point, found {available}"
    )]
    InsufficientWaters { required: usize, available: usize },
}

/// The liquid surface for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceEstimate {
    pub location: f64,
    pub width: f64,
    /// Axis positions of the oxygens that defined the surface, ascending.
    pub positions: Vec<f64>,
    pub top_surface: bool,
    /// Set when `width` exceeded the configured warning threshold.
    pub anomalous: bool,
}

impl SurfaceEstimate {
    /// Signed distance from the surface, positive on the vapour side.
    pub fn distance_to_surface(&self, position: f64) -> f64 {
        if self.top_surface {
            position - self.location
        } else {
            self.location - position
        }
    }
}

/// Locates the water surface from the oxygen positions of the assembled waters.
#[derive(Debug, Clone)]
pub struct SurfaceLocator {
    config: SurfaceConfig,
    frame: AxisFrame,
}

impl SurfaceLocator {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            config: config.surface.clone(),
            frame: config.system.axis_frame(),
        }
    }

    pub fn top_surface(&self) -> bool {
        self.config.top_surface
    }

    pub fn axis_frame(&self) -> &AxisFrame {
        &self.frame
    }

    /// Estimates the surface from every water molecule currently assembled in
    /// `system`.
    pub fn locate(&self, system: &MolecularSystem) -> Result<SurfaceEstimate, SurfaceError> {
        let positions = system
            .molecules_of_kind(MoleculeKind::Water)
            .filter_map(|(_, water)| water.atom_by_role("O"))
            .filter_map(|o| system.position(o))
            .map(|p| self.frame.position(&p));
        self.locate_positions(positions)
    }

    /// Estimates the surface from already unwrapped oxygen axis positions.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::InsufficientWaters`] when fewer than the configured
    /// number of surface waters remain after discarding those on the wrong side of
    /// the reference point.
    pub fn locate_positions<I>(&self, positions: I) -> Result<SurfaceEstimate, SurfaceError>
    where
        I: IntoIterator<Item = f64>,
    {
        let reference = self.config.reference_point;
        let top = self.config.top_surface;
        let required = self.config.surface_waters;

        let candidates: Vec<f64> = positions
            .into_iter()
            .filter(|&z| if top { z <= reference } else { z >= reference })
            .sorted_by(f64::total_cmp)
            .collect();

        if candidates.len() < required {
            return Err(SurfaceError::InsufficientWaters {
                required,
                available: candidates.len(),
            });
        }

        let extremal = if top {
            candidates[candidates.len() - required..].to_vec()
        } else {
            candidates[..required].to_vec()
        };

        let n = extremal.len() as f64;
        let location = extremal.iter().sum::<f64>() / n;
        let width = if extremal.len() > 1 {
            let ss: f64 = extremal.iter().map(|z| (z - location).powi(2)).sum();
            (ss / (n - 1.0)).sqrt()
        } else {
            0.0
        };

        let anomalous = width > self.config.width_warning;
        if anomalous {
            warn!(
                location,
                width,
                threshold = self.config.width_warning,
                positions = ?extremal,
                "Surface width exceeds threshold; check periodic unwrapping."
            );
        } else {
            trace!(location, width, "Surface located.");
        }

        Ok(SurfaceEstimate {
            location,
            width,
            positions: extremal,
            top_surface: top,
            anomalous,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::cell::PeriodicBox;
    use crate::engine::config::AnalysisConfigBuilder;

    fn locator(top: bool, n: usize) -> SurfaceLocator {
        let config = AnalysisConfigBuilder::new()
            .cell(PeriodicBox::new(20.0, 20.0, 100.0))
            .reference_point(50.0)
            .top_surface(top)
            .surface_waters(n)
            .position_range(-10.0, 10.0, 0.5)
            .angle_range(-1.0, 1.0, 0.1)
            .build()
            .unwrap();
        SurfaceLocator::new(&config)
    }

    #[test]
    fn top_surface_averages_highest_candidates_below_reference() {
        let estimate = locator(true, 2)
            .locate_positions([10.0, 30.0, 31.0, 29.0, 70.0])
            .unwrap();
        assert_eq!(estimate.positions, vec![30.0, 31.0]);
        assert!((estimate.location - 30.5).abs() < 1e-12);
        assert!((estimate.width - 0.5f64.sqrt()).abs() < 1e-12);
        assert!(!estimate.anomalous);
    }

    #[test]
    fn bottom_surface_averages_lowest_candidates_above_reference() {
        let estimate = locator(false, 2)
            .locate_positions([10.0, 60.0, 61.0, 75.0])
            .unwrap();
        assert_eq!(estimate.positions, vec![60.0, 61.0]);
        assert!((estimate.location - 60.5).abs() < 1e-12);
        assert_eq!(estimate.distance_to_surface(58.5), 2.0);
    }

    #[test]
    fn distance_is_positive_on_vapour_side_of_top_surface() {
        let estimate = locator(true, 1).locate_positions([40.0]).unwrap();
        assert_eq!(estimate.width, 0.0);
        assert_eq!(estimate.distance_to_surface(43.0), 3.0);
        assert_eq!(estimate.distance_to_surface(38.0), -2.0);
    }

    #[test]
    fn too_few_candidates_is_an_error() {
        let err = locator(true, 3)
            .locate_positions([10.0, 20.0, 80.0])
            .unwrap_err();
        assert_eq!(
            err,
            SurfaceError::InsufficientWaters {
                required: 3,
                available: 2
            }
        );
    }

    #[test]
    fn wide_surface_is_flagged_but_returned() {
        let estimate = locator(true, 2).locate_positions([10.0, 40.0]).unwrap();
        assert!(estimate.anomalous);
        assert!(estimate.width > 2.0);
    }

    #[test]
    fn location_is_deterministic_and_bounded() {
        let positions = [41.2, 44.9, 39.7, 43.3, 42.0, 45.5];
        let locator = locator(true, 4);
        let first = locator.locate_positions(positions).unwrap();
        let second = locator.locate_positions(positions).unwrap();
        assert_eq!(first, second);
        let min = positions.iter().copied().fold(f64::INFINITY, f64::min);
        let max = positions.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert!(first.location >= min && first.location <= max);
    }
}
