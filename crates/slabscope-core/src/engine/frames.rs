use crate::core::models::ids::AtomId;
use crate::core::models::molecule::{Molecule, MoleculeKind};
use crate::core::models::system::MolecularSystem;
use crate::core::utils::geometry::{
    bisector_of, center_of_mass, cos_angle, dihedral, plane_normal, tilt_degrees, twist_degrees,
};
use nalgebra::{Point3, Vector3};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    #[error("{kind} molecule has no atom with role '{role}'")]
    MissingRole {
        kind: MoleculeKind,
        role: &'static str,
    },
    #[error("Atom {0:?} of a molecule is not part of the system")]
    UnknownAtom(AtomId),
    #[error("Degenerate {kind} geometry: {what}")]
    Degenerate {
        kind: MoleculeKind,
        what: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaterFrame {
    pub o: Point3<f64>,
    pub oh1: Vector3<f64>,
    pub oh2: Vector3<f64>,
    pub bisector: Vector3<f64>,
    pub normal: Vector3<f64>,
}

impl WaterFrame {
    /// Cosines of both O-H bonds against `axis`, the larger magnitude first.
    pub fn oh_cosines(&self, axis: &Vector3<f64>) -> (f64, f64) {
        let a = cos_angle(&self.oh1, axis);
        let b = cos_angle(&self.oh2, axis);
        if a.abs() >= b.abs() { (a, b) } else { (b, a) }
    }
}

/// Hydronium or hydroxide.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtonatedWaterFrame {
    pub o: Point3<f64>,
    pub bonds: Vec<Vector3<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SulfurDioxideFrame {
    pub s: Point3<f64>,
    pub so1: Vector3<f64>,
    pub so2: Vector3<f64>,
    pub bisector: Vector3<f64>,
    pub normal: Vector3<f64>,
    /// Cosine of the O-S-O angle.
    pub cos_oso: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormaldehydeFrame {
    pub c: Point3<f64>,
    pub co: Vector3<f64>,
    pub ch1: Vector3<f64>,
    pub ch2: Vector3<f64>,
    pub hch_bisector: Vector3<f64>,
}

/// One -COOH group hanging off a carbon chain. Bond vectors leave the carboxyl carbon.
#[derive(Debug, Clone, PartialEq)]
pub struct CarboxylGroup {
    pub aliphatic_c: Point3<f64>,
    pub carbonyl_c: Point3<f64>,
    /// C=O bond.
    pub carbonyl: Vector3<f64>,
    /// C-O(H) bond.
    pub alcohol: Vector3<f64>,
    /// Unit bisector of the O-C-O angle.
    pub bisector: Vector3<f64>,
}

impl CarboxylGroup {
    /// Angle in degrees between the O-C-O bisector and `axis`.
    pub fn tilt(&self, axis: &Vector3<f64>) -> f64 {
        tilt_degrees(&self.bisector, axis)
    }

    /// Rotation in degrees of the C=O bond about the O-C-O bisector, measured
    /// from the plane of `axis` and the bisector.
    pub fn twist(&self, axis: &Vector3<f64>) -> f64 {
        twist_degrees(axis, &self.bisector, &self.carbonyl)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuccinicFrame {
    /// C1..C4, unwrapped so consecutive carbons are bonded without periodic jumps.
    pub chain: [Point3<f64>; 4],
    /// C1-C2-C3-C4 dihedral in radians.
    pub backbone_dihedral: f64,
    pub carboxyls: [CarboxylGroup; 2],
    pub methylene_bisectors: [Vector3<f64>; 2],
    pub center_of_mass: Point3<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MalonicFrame {
    pub c1: Point3<f64>,
    pub cm: Point3<f64>,
    pub c2: Point3<f64>,
    /// Unit bisector of the C1-CM-C2 angle.
    pub bisector: Vector3<f64>,
    pub cm_c1: Vector3<f64>,
    pub c1_o1: Vector3<f64>,
    pub c2_o2: Vector3<f64>,
    /// O1-C1-CM-C2 dihedral in radians.
    pub psi1: f64,
    /// O2-C2-CM-C1 dihedral in radians.
    pub psi2: f64,
    pub center_of_mass: Point3<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericFrame {
    pub center_of_mass: Point3<f64>,
}

/// Reference vectors of one molecule for the current frame.
///
/// Frames are plain values computed from the positions at the time of the call
/// and are never cached; build a new one every frame.
#[derive(Debug, Clone, PartialEq)]
pub enum MolecularFrame {
    Water(WaterFrame),
    ProtonatedWater(ProtonatedWaterFrame),
    SulfurDioxide(SulfurDioxideFrame),
    Formaldehyde(FormaldehydeFrame),
    Succinic(SuccinicFrame),
    Malonic(MalonicFrame),
    Generic(GenericFrame),
}

impl MolecularFrame {
    pub fn build(system: &MolecularSystem, molecule: &Molecule) -> Result<Self, FrameError> {
        let r = Resolver::new(system, molecule)?;
        let frame = match molecule.kind {
            MoleculeKind::Water => Self::Water(r.water()?),
            MoleculeKind::Hydronium | MoleculeKind::Hydroxide => {
                Self::ProtonatedWater(r.protonated_water()?)
            }
            MoleculeKind::SulfurDioxide => Self::SulfurDioxide(r.sulfur_dioxide()?),
            MoleculeKind::Formaldehyde => Self::Formaldehyde(r.formaldehyde()?),
            MoleculeKind::SuccinicAcid => Self::Succinic(r.succinic()?),
            MoleculeKind::Malonic(_) => Self::Malonic(r.malonic()?),
            MoleculeKind::Generic => Self::Generic(GenericFrame {
                center_of_mass: r.center_of_mass()?,
            }),
        };
        Ok(frame)
    }

    /// The point whose axis position locates the molecule relative to the surface.
    pub fn reference_point(&self) -> Point3<f64> {
        match self {
            Self::Water(f) => f.o,
            Self::ProtonatedWater(f) => f.o,
            Self::SulfurDioxide(f) => f.s,
            Self::Formaldehyde(f) => f.c,
            Self::Succinic(f) => f.center_of_mass,
            Self::Malonic(f) => f.center_of_mass,
            Self::Generic(f) => f.center_of_mass,
        }
    }
}

/// Role lookup with minimum-image unwrapping relative to the first atom.
struct Resolver<'a> {
    system: &'a MolecularSystem,
    molecule: &'a Molecule,
    anchor: AtomId,
    origin: Point3<f64>,
}

impl<'a> Resolver<'a> {
    fn new(system: &'a MolecularSystem, molecule: &'a Molecule) -> Result<Self, FrameError> {
        let anchor = *molecule.atoms().first().ok_or(FrameError::Degenerate {
            kind: molecule.kind,
            what: "molecule has no atoms",
        })?;
        let origin = system
            .position(anchor)
            .ok_or(FrameError::UnknownAtom(anchor))?;
        Ok(Self {
            system,
            molecule,
            anchor,
            origin,
        })
    }

    fn id(&self, role: &'static str) -> Result<AtomId, FrameError> {
        self.molecule
            .atom_by_role(role)
            .ok_or(FrameError::MissingRole {
                kind: self.molecule.kind,
                role,
            })
    }

    fn unwrapped(&self, id: AtomId) -> Result<Point3<f64>, FrameError> {
        self.system
            .displacement(self.anchor, id)
            .map(|d| self.origin + d)
            .ok_or(FrameError::UnknownAtom(id))
    }

    fn point(&self, role: &'static str) -> Result<Point3<f64>, FrameError> {
        self.unwrapped(self.id(role)?)
    }

    fn raw(&self, role: &'static str) -> Result<Point3<f64>, FrameError> {
        let id = self.id(role)?;
        self.system.position(id).ok_or(FrameError::UnknownAtom(id))
    }

    fn bond(&self, from: &'static str, to: &'static str) -> Result<Vector3<f64>, FrameError> {
        let (a, b) = (self.id(from)?, self.id(to)?);
        self.system
            .displacement(a, b)
            .ok_or(FrameError::UnknownAtom(b))
    }

    fn degenerate(&self, what: &'static str) -> FrameError {
        FrameError::Degenerate {
            kind: self.molecule.kind,
            what,
        }
    }

    fn bisector(&self, v1: &Vector3<f64>, v2: &Vector3<f64>) -> Result<Vector3<f64>, FrameError> {
        bisector_of(v1, v2).ok_or_else(|| self.degenerate("bisector of antiparallel bonds"))
    }

    fn normal(&self, v1: &Vector3<f64>, v2: &Vector3<f64>) -> Result<Vector3<f64>, FrameError> {
        plane_normal(v1, v2).ok_or_else(|| self.degenerate("collinear bonds have no plane"))
    }

    fn center_of_mass(&self) -> Result<Point3<f64>, FrameError> {
        let mut points = Vec::with_capacity(self.molecule.len());
        let mut masses = Vec::with_capacity(self.molecule.len());
        for &id in self.molecule.atoms() {
            points.push(self.unwrapped(id)?);
            masses.push(self.system.atom(id).map_or(0.0, |a| a.mass));
        }
        center_of_mass(&points, &masses).ok_or_else(|| self.degenerate("zero total mass"))
    }

    fn water(&self) -> Result<WaterFrame, FrameError> {
        let oh1 = self.bond("O", "H1")?;
        let oh2 = self.bond("O", "H2")?;
        Ok(WaterFrame {
            o: self.raw("O")?,
            bisector: self.bisector(&oh1, &oh2)?,
            normal: self.normal(&oh1, &oh2)?,
            oh1,
            oh2,
        })
    }

    fn protonated_water(&self) -> Result<ProtonatedWaterFrame, FrameError> {
        let o = self.id("O")?;
        let bonds = self
            .molecule
            .atoms()
            .iter()
            .filter(|&&id| id != o)
            .map(|&h| self.system.displacement(o, h).ok_or(FrameError::UnknownAtom(h)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ProtonatedWaterFrame {
            o: self.raw("O")?,
            bonds,
        })
    }

    fn sulfur_dioxide(&self) -> Result<SulfurDioxideFrame, FrameError> {
        let so1 = self.bond("S", "O1")?;
        let so2 = self.bond("S", "O2")?;
        Ok(SulfurDioxideFrame {
            s: self.raw("S")?,
            bisector: self.bisector(&so1, &so2)?,
            normal: self.normal(&so1, &so2)?,
            cos_oso: cos_angle(&so1, &so2),
            so1,
            so2,
        })
    }

    fn formaldehyde(&self) -> Result<FormaldehydeFrame, FrameError> {
        let ch1 = self.bond("C", "H1")?;
        let ch2 = self.bond("C", "H2")?;
        Ok(FormaldehydeFrame {
            c: self.raw("C")?,
            co: self.bond("C", "O")?,
            hch_bisector: self.bisector(&ch1, &ch2)?,
            ch1,
            ch2,
        })
    }

    fn carboxyl(
        &self,
        aliphatic: &'static str,
        carbon: &'static str,
        carbonyl_o: &'static str,
        alcohol_o: &'static str,
    ) -> Result<CarboxylGroup, FrameError> {
        let carbonyl = self.bond(carbon, carbonyl_o)?;
        let alcohol = self.bond(carbon, alcohol_o)?;
        Ok(CarboxylGroup {
            aliphatic_c: self.point(aliphatic)?,
            carbonyl_c: self.point(carbon)?,
            bisector: self.bisector(&carbonyl, &alcohol)?,
            carbonyl,
            alcohol,
        })
    }

    fn succinic(&self) -> Result<SuccinicFrame, FrameError> {
        let chain = [
            self.point("C1")?,
            self.point("C2")?,
            self.point("C3")?,
            self.point("C4")?,
        ];
        let methylene = |c: &'static str, h1: &'static str, h2: &'static str| {
            self.bisector(&self.bond(c, h1)?, &self.bond(c, h2)?)
        };
        Ok(SuccinicFrame {
            backbone_dihedral: dihedral(&chain[0], &chain[1], &chain[2], &chain[3]),
            carboxyls: [
                self.carboxyl("C2", "C1", "O1", "O3")?,
                self.carboxyl("C3", "C4", "O2", "O4")?,
            ],
            methylene_bisectors: [methylene("C2", "H3", "H4")?, methylene("C3", "H5", "H6")?],
            center_of_mass: self.center_of_mass()?,
            chain,
        })
    }

    fn malonic(&self) -> Result<MalonicFrame, FrameError> {
        let (c1, cm, c2) = (self.point("C1")?, self.point("CM")?, self.point("C2")?);
        let (o1, o2) = (self.point("O1")?, self.point("O2")?);
        Ok(MalonicFrame {
            bisector: self.bisector(&(c1 - cm), &(c2 - cm))?,
            cm_c1: c1 - cm,
            c1_o1: o1 - c1,
            c2_o2: o2 - c2,
            psi1: dihedral(&o1, &c1, &cm, &c2),
            psi2: dihedral(&o2, &c2, &cm, &c1),
            center_of_mass: self.center_of_mass()?,
            c1,
            cm,
            c2,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Element;
    use crate::core::models::cell::PeriodicBox;
    use crate::engine::assembler::MoleculeAssembler;
    use crate::engine::fixtures;
    use std::f64::consts::PI;

    const TOL: f64 = 1e-9;

    fn assembled(build: impl FnOnce(&mut MolecularSystem)) -> MolecularSystem {
        let config = fixtures::config(1);
        let mut system = MolecularSystem::new(fixtures::slab_box());
        build(&mut system);
        MoleculeAssembler::new(config.templates, config.bonds)
            .reparse(&mut system)
            .unwrap()
            .ensure_complete()
            .unwrap();
        system
    }

    fn only_frame(system: &MolecularSystem) -> MolecularFrame {
        let (_, molecule) = system.molecules_iter().next().unwrap();
        MolecularFrame::build(system, molecule).unwrap()
    }

    #[test]
    fn water_frame_has_bisector_along_z() {
        let system = assembled(|s| {
            fixtures::water(s, Point3::new(1.0, 2.0, 3.0), true);
        });
        let MolecularFrame::Water(frame) = only_frame(&system) else {
            panic!("expected a water frame");
        };
        assert!((frame.bisector - Vector3::z()).norm() < TOL);
        assert!((frame.normal.dot(&Vector3::y()).abs() - 1.0).abs() < TOL);
        let (first, second) = frame.oh_cosines(&Vector3::z());
        assert!((first - second).abs() < TOL);
        assert!((first - 0.59 / frame.oh1.norm()).abs() < TOL);
        assert_eq!(
            MolecularFrame::Water(frame).reference_point(),
            Point3::new(1.0, 2.0, 3.0)
        );
    }

    #[test]
    fn oh_cosines_put_larger_magnitude_first() {
        let frame = WaterFrame {
            o: Point3::origin(),
            oh1: Vector3::new(1.0, 0.0, 0.0),
            oh2: Vector3::new(0.0, 0.0, -1.0),
            bisector: Vector3::z(),
            normal: Vector3::y(),
        };
        assert_eq!(frame.oh_cosines(&Vector3::z()), (-1.0, 0.0));
    }

    #[test]
    fn bonds_use_minimum_image_across_the_box() {
        let mut system = MolecularSystem::new(PeriodicBox::new(10.0, 10.0, 10.0));
        let o = fixtures::push(&mut system, Element::O, Point3::new(9.8, 5.0, 5.0));
        let h1 = fixtures::push(&mut system, Element::H, Point3::new(0.56, 5.0, 5.59));
        let h2 = fixtures::push(&mut system, Element::H, Point3::new(9.04, 5.0, 5.59));
        let mut molecule = Molecule::new(MoleculeKind::Water);
        molecule.add_atom("O", o);
        molecule.add_atom("H1", h1);
        molecule.add_atom("H2", h2);

        let MolecularFrame::Water(frame) = MolecularFrame::build(&system, &molecule).unwrap() else {
            panic!("expected a water frame");
        };
        assert!((frame.oh1 - Vector3::new(0.76, 0.0, 0.59)).norm() < 1e-9);
        assert!((frame.bisector - Vector3::z()).norm() < 1e-9);
    }

    #[test]
    fn sulfur_dioxide_frame() {
        let system = assembled(|s| {
            fixtures::sulfur_dioxide(s, Point3::new(5.0, 5.0, 5.0));
        });
        let MolecularFrame::SulfurDioxide(frame) = only_frame(&system) else {
            panic!("expected an SO2 frame");
        };
        assert!((frame.bisector - Vector3::y()).norm() < TOL);
        assert!((frame.normal.dot(&Vector3::z()).abs() - 1.0).abs() < TOL);
        let expected = (-1.25 * 1.25 + 0.7 * 0.7) / (1.25f64.powi(2) + 0.49);
        assert!((frame.cos_oso - expected).abs() < TOL);
    }

    #[test]
    fn formaldehyde_frame() {
        let system = assembled(|s| {
            fixtures::formaldehyde(s, Point3::new(5.0, 5.0, 5.0));
        });
        let MolecularFrame::Formaldehyde(frame) = only_frame(&system) else {
            panic!("expected a formaldehyde frame");
        };
        assert!((frame.co - Vector3::new(1.2, 0.0, 0.0)).norm() < TOL);
        assert!((frame.hch_bisector + Vector3::x()).norm() < TOL);
    }

    #[test]
    fn planar_succinic_backbone_is_anti() {
        let system = assembled(|s| {
            fixtures::succinic_acid(s, Point3::new(5.0, 5.0, 5.0));
        });
        let MolecularFrame::Succinic(frame) = only_frame(&system) else {
            panic!("expected a succinic frame");
        };
        assert!((frame.backbone_dihedral.abs() - PI).abs() < TOL);
        for group in &frame.carboxyls {
            // The molecule lies in the xy plane, so every O-C-O bisector is
            // perpendicular to z.
            assert!((group.tilt(&Vector3::z()) - 90.0).abs() < 1e-6);
        }
        for bisector in &frame.methylene_bisectors {
            assert!(bisector.z.abs() < TOL);
        }
        let com = frame.center_of_mass;
        assert!(com.x > 5.0 && com.x < 8.75);
        assert!((com.z - 5.0).abs() < TOL);
    }

    #[test]
    fn carboxyl_twist_is_zero_for_bond_on_far_side_of_axis_plane() {
        let group = CarboxylGroup {
            aliphatic_c: Point3::origin(),
            carbonyl_c: Point3::new(0.0, 0.0, 1.5),
            carbonyl: Vector3::new(1.0, 0.0, -1.0),
            alcohol: Vector3::new(-1.0, 0.0, 1.0),
            bisector: Vector3::x(),
        };
        assert!(group.twist(&Vector3::z()).abs() < 1e-9);
        assert!((group.tilt(&Vector3::z()) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn planar_malonic_carboxyls_are_trans_to_the_chain() {
        let system = assembled(|s| {
            fixtures::malonic(s, Point3::new(5.0, 5.0, 5.0), 2);
        });
        let MolecularFrame::Malonic(frame) = only_frame(&system) else {
            panic!("expected a malonic frame");
        };
        assert!((frame.psi1.abs() - PI).abs() < TOL);
        assert!((frame.psi2.abs() - PI).abs() < TOL);
        assert!((frame.bisector + Vector3::y()).norm() < TOL);
        assert_eq!(
            MolecularFrame::Malonic(frame.clone()).reference_point(),
            frame.center_of_mass
        );
    }

    #[test]
    fn missing_role_is_reported() {
        let mut system = MolecularSystem::new(fixtures::slab_box());
        let [s, o1, _] = fixtures::sulfur_dioxide(&mut system, Point3::new(5.0, 5.0, 5.0));
        let mut molecule = Molecule::new(MoleculeKind::SulfurDioxide);
        molecule.add_atom("S", s);
        molecule.add_atom("O1", o1);
        assert_eq!(
            MolecularFrame::build(&system, &molecule).unwrap_err(),
            FrameError::MissingRole {
                kind: MoleculeKind::SulfurDioxide,
                role: "O2"
            }
        );
    }

    #[test]
    fn generic_frame_uses_center_of_mass() {
        let mut system = MolecularSystem::new(fixtures::slab_box());
        let [c, o, ..] = fixtures::formaldehyde(&mut system, Point3::new(5.0, 5.0, 5.0));
        let mut molecule = Molecule::new(MoleculeKind::Generic);
        molecule.add_atom("C", c);
        molecule.add_atom("O", o);
        let frame = MolecularFrame::build(&system, &molecule).unwrap();
        let x = (12.011 * 5.0 + 15.999 * 6.2) / (12.011 + 15.999);
        assert!((frame.reference_point().x - x).abs() < 1e-6);
    }
}
