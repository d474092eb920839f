//! Hand-built molecules with textbook geometry, shared by the engine and workflow tests.

use crate::core::models::atom::{Atom, Element};
use crate::core::models::cell::PeriodicBox;
use crate::core::models::ids::AtomId;
use crate::core::models::system::MolecularSystem;
use crate::engine::assembler::MoleculeAssembler;
use crate::engine::config::{AnalysisConfig, AnalysisConfigBuilder};
use nalgebra::{Point3, Vector3};

pub(crate) fn push(system: &mut MolecularSystem, element: Element, p: Point3<f64>) -> AtomId {
    let index = system.atom_count();
    system.add_atom(Atom::new(index, element.symbol(), element, p))
}

fn at(origin: &Point3<f64>, x: f64, y: f64, z: f64) -> Point3<f64> {
    origin + Vector3::new(x, y, z)
}

/// A water whose H-O-H bisector points along +z, or -z when `up` is false.
pub(crate) fn water(system: &mut MolecularSystem, o: Point3<f64>, up: bool) -> [AtomId; 3] {
    let dz = if up { 0.59 } else { -0.59 };
    [
        push(system, Element::O, o),
        push(system, Element::H, at(&o, 0.76, 0.0, dz)),
        push(system, Element::H, at(&o, -0.76, 0.0, dz)),
    ]
}

/// An SO2 in the xy plane with its O-S-O bisector along +y.
pub(crate) fn sulfur_dioxide(system: &mut MolecularSystem, s: Point3<f64>) -> [AtomId; 3] {
    [
        push(system, Element::S, s),
        push(system, Element::O, at(&s, 1.25, 0.7, 0.0)),
        push(system, Element::O, at(&s, -1.25, 0.7, 0.0)),
    ]
}

pub(crate) fn formaldehyde(system: &mut MolecularSystem, c: Point3<f64>) -> [AtomId; 4] {
    [
        push(system, Element::C, c),
        push(system, Element::O, at(&c, 1.2, 0.0, 0.0)),
        push(system, Element::H, at(&c, -0.55, 0.95, 0.0)),
        push(system, Element::H, at(&c, -0.55, -0.95, 0.0)),
    ]
}

/// A planar zig-zag succinic acid with its chain along +x starting at `origin`.
///
/// Atom order: C1 C2 C3 C4, carbonyl O of C1 and C4, alcohol O of C1 and C4,
/// acid H of C1 and C4, then the two methylene H of C2 and of C3.
pub(crate) fn succinic_acid(system: &mut MolecularSystem, origin: Point3<f64>) -> Vec<AtomId> {
    let layout = [
        (Element::C, 0.0, 0.0, 0.0),
        (Element::C, 1.25, 0.85, 0.0),
        (Element::C, 2.5, 0.0, 0.0),
        (Element::C, 3.75, 0.85, 0.0),
        (Element::O, -1.0, 0.6, 0.0),
        (Element::O, 4.75, 0.25, 0.0),
        (Element::O, 0.0, -1.3, 0.0),
        (Element::O, 3.75, 2.15, 0.0),
        (Element::H, 0.9, -1.6, 0.0),
        (Element::H, 2.85, 2.45, 0.0),
        (Element::H, 1.25, 1.5, 0.9),
        (Element::H, 1.25, 1.5, -0.9),
        (Element::H, 2.5, -0.65, 0.9),
        (Element::H, 2.5, -0.65, -0.9),
    ];
    layout.iter()
        .map(|&(e, x, y, z)| push(system, e, at(&origin, x, y, z)))
        .collect()
}

/// A malonic acid C1-CM-C2 in the xy plane with `acid_hydrogens` of its two acid
/// protons present (0, 1 or 2).
///
/// Atom order: C1 CM C2, carbonyl O of C1 and C2, alcohol O of C1 and C2, the
/// present acid H, then the two methylene H.
pub(crate) fn malonic(
    system: &mut MolecularSystem,
    origin: Point3<f64>,
    acid_hydrogens: usize,
) -> Vec<AtomId> {
    let mut layout = vec![
        (Element::C, 0.0, 0.0, 0.0),
        (Element::C, 1.25, 0.85, 0.0),
        (Element::C, 2.5, 0.0, 0.0),
        (Element::O, -1.0, 0.6, 0.0),
        (Element::O, 3.5, 0.6, 0.0),
        (Element::O, 0.0, -1.3, 0.0),
        (Element::O, 2.5, -1.3, 0.0),
    ];
    let acid = [(Element::H, -0.9, -1.6, 0.0), (Element::H, 3.4, -1.6, 0.0)];
    layout.extend(acid.iter().take(acid_hydrogens));
    layout.push((Element::H, 1.25, 1.5, 0.9));
    layout.push((Element::H, 1.25, 1.5, -0.9));
    layout.iter()
        .map(|&(e, x, y, z)| push(system, e, at(&origin, x, y, z)))
        .collect()
}

pub(crate) fn slab_box() -> PeriodicBox {
    PeriodicBox::new(30.0, 30.0, 100.0)
}

/// A run configuration for the slab box with the surface tracked from above at z = 50.
pub(crate) fn config_builder(surface_waters: usize) -> AnalysisConfigBuilder {
    AnalysisConfigBuilder::new()
        .cell(slab_box())
        .reference_point(50.0)
        .surface_waters(surface_waters)
        .position_range(-10.0, 10.0, 1.0)
        .angle_range(-1.0, 1.0, 0.1)
}

pub(crate) fn config(surface_waters: usize) -> AnalysisConfig {
    config_builder(surface_waters).build().unwrap()
}

/// Assembles every molecule of `system` with the bond rules and templates of `config`.
pub(crate) fn assemble(system: &mut MolecularSystem, config: &AnalysisConfig) {
    MoleculeAssembler::new(config.templates.clone(), config.bonds.clone())
        .reparse(system)
        .unwrap()
        .ensure_complete()
        .unwrap();
}
