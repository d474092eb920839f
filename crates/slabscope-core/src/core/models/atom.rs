use super::ids::MoleculeId;
use nalgebra::Point3;
use std::fmt;
use std::str::FromStr;

/// The chemical element of an atom.
///
/// Only the elements that appear in aqueous slab systems with small organic or
/// sulfur-containing solutes get their own variant. Anything else parses to
/// [`Element::Other`] so that exotic atoms still end up in the arena and surface
/// as unparsed atoms instead of aborting the trajectory read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Element {
    /// Hydrogen.
    H,
    /// Carbon.
    C,
    /// Nitrogen.
    N,
    /// Oxygen.
    O,
    /// Sulfur.
    S,
    /// Chlorine.
    Cl,
    /// Unknown or unsupported element.
    #[default]
    Other,
}

impl Element {
    /// Standard atomic mass in g/mol.
    pub fn mass(self) -> f64 {
        match self {
            Element::H => 1.008,
            Element::C => 12.011,
            Element::N => 14.007,
            Element::O => 15.999,
            Element::S => 32.06,
            Element::Cl => 35.45,
            Element::Other => 0.0,
        }
    }

    /// The element symbol as written in coordinate files.
    pub fn symbol(self) -> &'static str {
        match self {
            Element::H => "H",
            Element::C => "C",
            Element::N => "N",
            Element::O => "O",
            Element::S => "S",
            Element::Cl => "Cl",
            Element::Other => "X",
        }
    }

    /// Whether the element can donate or accept a hydrogen bond.
    pub fn is_hbond_heavy_atom(self) -> bool {
        matches!(self, Element::O | Element::N)
    }
}

impl FromStr for Element {
    type Err = ();

    /// Parses an element symbol, ignoring case.
    ///
    /// Trailing digits are stripped so that labels such as `O1` or `H12`
    /// resolve to their element.
    ///
    /// # Errors
    ///
    /// Returns `()` when the label is empty or starts with a digit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let symbol = s.trim().trim_end_matches(|c: char| c.is_ascii_digit());
        if symbol.is_empty() || symbol.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(());
        }
        Ok(match symbol.to_ascii_lowercase().as_str() {
            "h" => Element::H,
            "c" => Element::C,
            "n" => Element::N,
            "o" => Element::O,
            "s" => Element::S,
            "cl" => Element::Cl,
            _ => Element::Other,
        })
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A single atom of the simulated system.
///
/// Atoms are created once when the trajectory is opened and live for the whole
/// run. Everything except `position` and the `molecule` back-reference is fixed
/// after creation; positions are overwritten on every frame load.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Zero-based index of the atom within each trajectory frame.
    pub index: usize,
    /// The label given in the coordinate file (e.g. "O", "H1", "OW").
    pub name: String,
    /// The chemical element.
    pub element: Element,
    /// The current Cartesian position in Angstroms.
    pub position: Point3<f64>,
    /// Atomic mass in g/mol.
    pub mass: f64,
    /// Residue tag of the molecule this atom was assigned to (e.g. "h2o").
    pub residue: String,
    /// Non-owning reference to the molecule that currently contains this atom.
    pub molecule: Option<MoleculeId>,
}

impl Atom {
    /// Creates a new atom whose mass is taken from its element.
    ///
    /// # Arguments
    ///
    /// * `index` - The position of the atom within a frame.
    /// * `name` - The label of the atom.
    /// * `element` - The chemical element.
    /// * `position` - The initial coordinates.
    pub fn new(index: usize, name: &str, element: Element, position: Point3<f64>) -> Self {
        Self {
            index,
            name: name.to_string(),
            element,
            position,
            mass: element.mass(),
            residue: String::new(),
            molecule: None,
        }
    }
}
