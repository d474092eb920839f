use super::atom::Element;
use super::ids::AtomId;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Protonation state of a malonic acid molecule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MalonicState {
    /// Both carboxylic groups carry their acid hydrogen.
    Acid,
    /// One acid hydrogen has been lost.
    Malonate,
    /// Both acid hydrogens have been lost.
    Dimalonate,
}

/// The closed set of molecule kinds the assembler can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoleculeKind {
    Water,                 // H2O
    Hydronium,             // H3O+
    Hydroxide,             // OH-
    SulfurDioxide,         // SO2, the adsorbing solute
    SuccinicAcid,          // HOOC-CH2-CH2-COOH
    Malonic(MalonicState), // HOOC-CH2-COOH and its anions
    Formaldehyde,          // H2CO
    Generic,
}

impl MoleculeKind {
    /// Residue tag written onto every atom of a molecule of this kind.
    pub fn residue_name(self) -> &'static str {
        match self {
            MoleculeKind::Water => "h2o",
            MoleculeKind::Hydronium => "h3o",
            MoleculeKind::Hydroxide => "oh",
            MoleculeKind::SulfurDioxide => "so2",
            MoleculeKind::SuccinicAcid => "succinic",
            MoleculeKind::Malonic(MalonicState::Acid) => "malonic",
            MoleculeKind::Malonic(MalonicState::Malonate) => "malonate",
            MoleculeKind::Malonic(MalonicState::Dimalonate) => "dimalonate",
            MoleculeKind::Formaldehyde => "formaldehyde",
            MoleculeKind::Generic => "generic",
        }
    }
}

impl MoleculeKind {
    /// `(central, outer, count)` for the kinds made of one atom and its bound
    /// neighbours.
    pub fn simple_shape(self) -> Option<(Element, Element, usize)> {
        match self {
            MoleculeKind::Water => Some((Element::O, Element::H, 2)),
            MoleculeKind::Hydronium => Some((Element::O, Element::H, 3)),
            MoleculeKind::Hydroxide => Some((Element::O, Element::H, 1)),
            MoleculeKind::SulfurDioxide => Some((Element::S, Element::O, 2)),
            _ => None,
        }
    }
}

impl fmt::Display for MoleculeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.residue_name())
    }
}

impl FromStr for MoleculeKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "h2o" | "water" => Ok(MoleculeKind::Water),
            "h3o" | "hydronium" => Ok(MoleculeKind::Hydronium),
            "oh" | "hydroxide" => Ok(MoleculeKind::Hydroxide),
            "so2" | "sulfur-dioxide" => Ok(MoleculeKind::SulfurDioxide),
            "succinic" | "succinic-acid" => Ok(MoleculeKind::SuccinicAcid),
            "malonic" => Ok(MoleculeKind::Malonic(MalonicState::Acid)),
            "malonate" => Ok(MoleculeKind::Malonic(MalonicState::Malonate)),
            "dimalonate" => Ok(MoleculeKind::Malonic(MalonicState::Dimalonate)),
            "formaldehyde" => Ok(MoleculeKind::Formaldehyde),
            "generic" => Ok(MoleculeKind::Generic),
            _ => Err(()),
        }
    }
}

/// A group of atoms assembled into one molecule.
///
/// Molecules never own their atoms: they hold ids into the system arena, in the
/// order the assembler added them, plus a map from role names ("O", "H1", "C2",
/// ...) to ids so that frame builders can address atoms by their chemical role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Molecule {
    pub kind: MoleculeKind,
    pub(crate) atoms: Vec<AtomId>,
    role_map: HashMap<String, AtomId>,
}

impl Molecule {
    pub(crate) fn new(kind: MoleculeKind) -> Self {
        Self {
            kind,
            atoms: Vec::new(),
            role_map: HashMap::new(),
        }
    }

    pub(crate) fn add_atom(&mut self, role: &str, atom_id: AtomId) {
        self.atoms.push(atom_id);
        self.role_map.insert(role.to_string(), atom_id);
    }

    pub fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atom_by_role(&self, role: &str) -> Option<AtomId> {
        self.role_map.get(role).copied()
    }

    pub fn contains(&self, atom_id: AtomId) -> bool {
        self.atoms.contains(&atom_id)
    }
}
