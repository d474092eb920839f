use super::{not_set_up, open_sink};
use crate::core::graph::bond_graph::{BondGraph, BondKind};
use crate::core::io::sink::OutputSink;
use crate::core::models::ids::AtomId;
use crate::core::models::molecule::{Molecule, MoleculeKind};
use crate::core::models::system::MolecularSystem;
use crate::core::utils::geometry::cos_angle;
use crate::engine::analysis::{Analysis, FrameContext, StepOutcome};
use crate::engine::config::AnalysisConfig;
use crate::engine::error::AnalysisError;
use crate::engine::frames::{FrameError, MolecularFrame, WaterFrame};
use tracing::{info, warn};

const OUTPUT_FILE: &str = "first-adsorption-water.dat";
/// Waters considered as binding candidates, nearest to the sulfur first.
const NEAREST_WATERS: usize = 10;

/// The water that was first seen bound to the SO2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundWater {
    /// Oxygen of the water. Atom ids survive reparsing, molecule ids do not.
    pub oxygen: AtomId,
    pub timestep: usize,
    /// Pass in which the binding was detected.
    pub pass: usize,
}

/// Follows the first water to bind an SO2 molecule over the whole trajectory.
///
/// The first pass searches for a water linked to the sulfur by an interaction
/// edge or hydrogen bonded to one of the SO2 oxygens. Once one is found the
/// trajectory is rewound, and every frame of the next pass writes
/// `so2-distance s-o-distance surface-width water-distance cos(water,axis) cos(water,so2)`.
#[derive(Debug, Default)]
pub struct So2Adsorption {
    graph: Option<BondGraph>,
    sink: Option<OutputSink>,
    bound: Option<BoundWater>,
    rows: usize,
}

impl So2Adsorption {
    pub const NAME: &'static str = "so2-adsorption";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn bound_water(&self) -> Option<BoundWater> {
        self.bound
    }

    fn sulfur_dioxide<'s>(system: &'s MolecularSystem) -> Result<&'s Molecule, AnalysisError> {
        system
            .molecules_of_kind(MoleculeKind::SulfurDioxide)
            .map(|(_, molecule)| molecule)
            .next()
            .ok_or_else(|| AnalysisError::Invalid("no SO2 molecule in the system".to_string()))
    }

    /// Oxygen of the bound water closest to the sulfur, if any water is bound.
    fn find_bound_water(&mut self, system: &MolecularSystem) -> Result<Option<AtomId>, AnalysisError> {
        let graph = self.graph.as_mut().ok_or_else(|| not_set_up(Self::NAME))?;
        let so2 = Self::sulfur_dioxide(system)?;
        let role = |role: &'static str| {
            so2.atom_by_role(role).ok_or(FrameError::MissingRole {
                kind: MoleculeKind::SulfurDioxide,
                role,
            })
        };
        let (s, o1, o2) = (role("S")?, role("O1")?, role("O2")?);
        let s_pos = system.position(s).ok_or(FrameError::UnknownAtom(s))?;
        let cell = system.cell();

        let mut candidates: Vec<(f64, &Molecule)> = system
            .molecules_of_kind(MoleculeKind::Water)
            .filter_map(|(_, water)| {
                let o = system.position(water.atom_by_role("O")?)?;
                Some((cell.distance(&o, &s_pos), water))
            })
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut atoms = vec![s, o1, o2];
        for (_, water) in candidates.iter().take(NEAREST_WATERS) {
            atoms.extend_from_slice(water.atoms());
        }
        graph.update(system, &atoms);

        let mut bound = graph.bonded_atoms(s, BondKind::Interaction, None);
        bound.extend(graph.bonded_atoms(o1, BondKind::HydrogenBond, None));
        bound.extend(graph.bonded_atoms(o2, BondKind::HydrogenBond, None));

        let oxygen = bound
            .into_iter()
            .filter_map(|atom| {
                let molecule = system.molecule(system.atom(atom)?.molecule?)?;
                if molecule.kind != MoleculeKind::Water {
                    return None;
                }
                let o = molecule.atom_by_role("O")?;
                Some((system.distance(o, s)?, o))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, o)| o);
        Ok(oxygen)
    }

    fn write_row(&mut self, ctx: &FrameContext, bound: BoundWater) -> Result<(), AnalysisError> {
        let system = ctx.system;
        let so2 = match MolecularFrame::build(system, Self::sulfur_dioxide(system)?)? {
            MolecularFrame::SulfurDioxide(frame) => frame,
            _ => return Err(AnalysisError::Invalid("SO2 frame expected".to_string())),
        };
        let Some(water) = water_frame(system, bound.oxygen)? else {
            warn!(
                timestep = ctx.timestep,
                "The bound water is no longer a water molecule; row skipped."
            );
            return Ok(());
        };

        let surface = ctx.surface()?;
        let axis = ctx.axis_frame().unit_vector();
        let row = AdsorptionRow {
            so2_distance: ctx.distance_to_surface(&so2.s)?,
            sulfur_oxygen: system.cell().distance(&so2.s, &water.o),
            surface_width: surface.width,
            water_distance: ctx.distance_to_surface(&water.o)?,
            water_axis_cos: cos_angle(&water.bisector, &axis),
            water_so2_cos: cos_angle(&water.bisector, &so2.bisector),
        };
        let sink = self.sink.as_mut().ok_or_else(|| not_set_up(Self::NAME))?;
        sink.append(&row.format())?;
        self.rows += 1;
        Ok(())
    }
}

/// Frame of the water that owns `oxygen`, or `None` if the atom no longer
/// belongs to a water.
fn water_frame(system: &MolecularSystem, oxygen: AtomId) -> Result<Option<WaterFrame>, AnalysisError> {
    let Some(molecule) = system
        .atom(oxygen)
        .and_then(|atom| atom.molecule)
        .and_then(|id| system.molecule(id))
    else {
        return Ok(None);
    };
    if molecule.kind != MoleculeKind::Water {
        return Ok(None);
    }
    match MolecularFrame::build(system, molecule)? {
        MolecularFrame::Water(frame) => Ok(Some(frame)),
        _ => Ok(None),
    }
}

struct AdsorptionRow {
    so2_distance: f64,
    sulfur_oxygen: f64,
    surface_width: f64,
    water_distance: f64,
    water_axis_cos: f64,
    water_so2_cos: f64,
}

impl AdsorptionRow {
    fn format(&self) -> String {
        format!(
            "{:9.3} {:9.3} {:9.3} {:9.3} {:9.3} {:9.3}\n",
            self.so2_distance,
            self.sulfur_oxygen,
            self.surface_width,
            self.water_distance,
            self.water_axis_cos,
            self.water_so2_cos
        )
    }
}

impl Analysis for So2Adsorption {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Finds the first water bound to the SO2, then follows it from the start of the trajectory"
    }

    fn setup(&mut self, config: &AnalysisConfig) -> Result<(), AnalysisError> {
        self.graph = Some(BondGraph::new(config.bonds.clone()));
        self.sink = Some(open_sink(config, OUTPUT_FILE)?);
        self.bound = None;
        self.rows = 0;
        Ok(())
    }

    fn analyze(&mut self, ctx: &FrameContext) -> Result<StepOutcome, AnalysisError> {
        let bound = self.bound;
        match bound {
            None => {
                let Some(oxygen) = self.find_bound_water(ctx.system)? else {
                    return Ok(StepOutcome::Continue);
                };
                info!(
                    timestep = ctx.timestep,
                    atom = ctx.system.atom(oxygen).map(|a| a.index),
                    "Found the first water bound to the SO2; rewinding."
                );
                self.bound = Some(BoundWater {
                    oxygen,
                    timestep: ctx.timestep,
                    pass: ctx.pass,
                });
                Ok(StepOutcome::Rewind)
            }
            Some(bound) if ctx.pass > bound.pass => {
                self.write_row(ctx, bound)?;
                Ok(StepOutcome::Continue)
            }
            Some(_) => Ok(StepOutcome::Continue),
        }
    }

    fn flush(&mut self) -> Result<(), AnalysisError> {
        if let Some(sink) = self.sink.as_mut() {
            sink.flush()?;
        }
        Ok(())
    }

    fn post_process(&mut self) -> Result<(), AnalysisError> {
        match self.bound {
            Some(bound) => info!(
                found_at = bound.timestep,
                rows = self.rows,
                "SO2 adsorption analysis complete"
            ),
            None => warn!("No water ever bound to the SO2; nothing was written."),
        }
        Ok(())
    }
}
