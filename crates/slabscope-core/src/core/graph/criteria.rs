use crate::core::models::atom::Element;
use phf::{Map, phf_map};
use std::collections::HashMap;
use std::str::FromStr;

/// Covalent bond cutoffs in Angstroms, keyed by the alphabetically ordered pair
/// of element symbols.
static COVALENT_CUTOFFS: Map<&'static str, f64> = phf_map! {
    "H-O" => 1.2,
    "C-H" => 1.2,
    "C-O" => 1.6,
    "C-C" => 1.7,
    "O-S" => 1.8,
    "N-O" => 1.6,
    "H-N" => 1.2,
};

/// Non-bonded interaction cutoffs, used to detect a solute atom sitting in
/// contact with a water molecule.
static INTERACTION_CUTOFFS: Map<&'static str, f64> = phf_map! {
    "O-S" => 3.4,
    "N-S" => 3.4,
};

pub const DEFAULT_HBOND_DISTANCE: f64 = 2.46;
pub const DEFAULT_HBOND_MIN_ANGLE: f64 = 130.0;

fn ordered(a: Element, b: Element) -> (Element, Element) {
    if a.symbol() <= b.symbol() { (a, b) } else { (b, a) }
}

fn pair_key(a: Element, b: Element) -> String {
    let (a, b) = ordered(a, b);
    format!("{}-{}", a.symbol(), b.symbol())
}

/// Parses an element pair written as `"O-H"` (order does not matter).
pub fn parse_element_pair(s: &str) -> Option<(Element, Element)> {
    let (a, b) = s.split_once('-')?;
    let a = Element::from_str(a).ok()?;
    let b = Element::from_str(b).ok()?;
    if a == Element::Other || b == Element::Other {
        return None;
    }
    Some(ordered(a, b))
}

/// The geometric rules that decide which edges the bond graph creates.
#[derive(Debug, Clone, PartialEq)]
pub struct BondCriteria {
    covalent: HashMap<(Element, Element), f64>,
    interaction: HashMap<(Element, Element), f64>,
    /// Maximum H···acceptor separation for a hydrogen bond.
    pub hbond_distance: f64,
    /// Minimum donor-H···acceptor angle in degrees for a hydrogen bond.
    pub hbond_min_angle: f64,
}

impl Default for BondCriteria {
    fn default() -> Self {
        let load = |table: &Map<&'static str, f64>| {
            table
                .entries()
                .filter_map(|(key, &cutoff)| parse_element_pair(key).map(|pair| (pair, cutoff)))
                .collect()
        };
        Self {
            covalent: load(&COVALENT_CUTOFFS),
            interaction: load(&INTERACTION_CUTOFFS),
            hbond_distance: DEFAULT_HBOND_DISTANCE,
            hbond_min_angle: DEFAULT_HBOND_MIN_ANGLE,
        }
    }
}

impl BondCriteria {
    pub fn covalent_cutoff(&self, a: Element, b: Element) -> Option<f64> {
        self.covalent.get(&ordered(a, b)).copied()
    }

    pub fn interaction_cutoff(&self, a: Element, b: Element) -> Option<f64> {
        self.interaction.get(&ordered(a, b)).copied()
    }

    pub fn set_covalent_cutoff(&mut self, a: Element, b: Element, cutoff: f64) {
        self.covalent.insert(ordered(a, b), cutoff);
    }

    pub fn set_interaction_cutoff(&mut self, a: Element, b: Element, cutoff: f64) {
        self.interaction.insert(ordered(a, b), cutoff);
    }

    /// Human-readable listing of the covalent table, sorted by pair.
    pub fn covalent_table(&self) -> Vec<(String, f64)> {
        let mut rows: Vec<(String, f64)> = self
            .covalent
            .iter()
            .map(|(&(a, b), &cutoff)| (pair_key(a, b), cutoff))
            .collect();
        rows.sort_by(|x, y| x.0.cmp(&y.0));
        rows
    }
}
