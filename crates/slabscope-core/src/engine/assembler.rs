use crate::core::graph::bond_graph::{BondGraph, BondKind};
use crate::core::graph::criteria::BondCriteria;
use crate::core::models::atom::Element;
use crate::core::models::ids::AtomId;
use crate::core::models::molecule::{MalonicState, Molecule, MoleculeKind};
use crate::core::models::system::{ModelError, MolecularSystem};
use crate::core::topology::registry::{SimpleTemplate, TemplateRegistry};
use itertools::Itertools;
use nalgebra::Point3;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use thiserror::Error;
use tracing::{debug, instrument};

/// An atom left without a molecule after assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct UnparsedAtom {
    pub index: usize,
    pub name: String,
    pub element: Element,
    pub position: Point3<f64>,
}

impl fmt::Display for UnparsedAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  #{:<6} {:<6} {:<2} ({:.4}, {:.4}, {:.4})",
            self.index, self.name, self.element, self.position.x, self.position.y, self.position.z
        )
    }
}

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error(
        "{} atom(s) could not be assigned to any molecule; the molecular topology does not match the trajectory:\n{}",
        .atoms.len(),
        .atoms.iter().join("\n")
    )]
    UnparsedAtoms { atoms: Vec<UnparsedAtom> },

    #[error("Failed to store an assembled molecule: {0}")]
    Model(#[from] ModelError),
}

/// The outcome of one reparse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblyReport {
    pub counts: HashMap<MoleculeKind, usize>,
    pub unparsed: Vec<UnparsedAtom>,
}

impl AssemblyReport {
    pub fn count(&self, kind: MoleculeKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn molecule_count(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_complete(&self) -> bool {
        self.unparsed.is_empty()
    }

    /// # Errors
    ///
    /// Returns [`AssemblyError::UnparsedAtoms`] listing every atom that no
    /// template or parser claimed.
    pub fn ensure_complete(self) -> Result<Self, AssemblyError> {
        if self.unparsed.is_empty() {
            Ok(self)
        } else {
            Err(AssemblyError::UnparsedAtoms {
                atoms: self.unparsed,
            })
        }
    }
}

struct Carboxyl {
    carbonyl_o: AtomId,
    alcohol_o: AtomId,
    acid_h: Option<AtomId>,
}

/// Groups a flat atom list into typed molecules using covalent connectivity.
///
/// Simple templates run first, in registry order; the carbon-chain parser then
/// handles formaldehyde, the malonic family and succinic acid.
#[derive(Debug, Clone)]
pub struct MoleculeAssembler {
    templates: TemplateRegistry,
    graph: BondGraph,
}

impl MoleculeAssembler {
    pub fn new(templates: TemplateRegistry, criteria: BondCriteria) -> Self {
        Self {
            templates,
            graph: BondGraph::new(criteria),
        }
    }

    pub fn graph(&self) -> &BondGraph {
        &self.graph
    }

    /// Rebuilds the bond graph over every atom and re-assembles all molecules.
    #[instrument(skip_all, name = "reparse")]
    pub fn reparse(&mut self, system: &mut MolecularSystem) -> Result<AssemblyReport, AssemblyError> {
        let ids = system.atom_ids().to_vec();
        self.graph.update(system, &ids);
        self.assemble(system)
    }

    /// Replaces the molecules of `system` with those found in the current graph.
    pub fn assemble(&self, system: &mut MolecularSystem) -> Result<AssemblyReport, AssemblyError> {
        system.clear_molecules();
        let order = system.atom_ids().to_vec();
        let mut pool: HashSet<AtomId> = order.iter().copied().collect();

        let mut molecules = Vec::new();
        for template in self.templates.templates() {
            molecules.extend(self.match_template(system, template, &order, &mut pool));
        }
        molecules.extend(self.parse_carbon_chains(system, &order, &mut pool));

        let mut report = AssemblyReport::default();
        for molecule in molecules {
            *report.counts.entry(molecule.kind).or_insert(0) += 1;
            system.add_molecule(molecule)?;
        }
        report.unparsed = order
            .iter()
            .filter(|id| pool.contains(id))
            .filter_map(|&id| system.atom(id))
            .map(|atom| UnparsedAtom {
                index: atom.index,
                name: atom.name.clone(),
                element: atom.element,
                position: atom.position,
            })
            .collect();

        debug!(
            molecules = report.molecule_count(),
            unparsed = report.unparsed.len(),
            "Molecules assembled."
        );
        Ok(report)
    }

    fn element(system: &MolecularSystem, id: AtomId) -> Option<Element> {
        system.atom(id).map(|a| a.element)
    }

    fn match_template(
        &self,
        system: &MolecularSystem,
        template: &SimpleTemplate,
        order: &[AtomId],
        pool: &mut HashSet<AtomId>,
    ) -> Vec<Molecule> {
        let mut found = Vec::new();
        for &id in order {
            if !pool.contains(&id) || Self::element(system, id) != Some(template.central) {
                continue;
            }
            let (outer, other): (Vec<AtomId>, Vec<AtomId>) = self
                .graph
                .bonded_atoms(id, BondKind::Covalent, None)
                .into_iter()
                .partition(|&n| {
                    pool.contains(&n) && Self::element(system, n) == Some(template.outer)
                });
            if outer.len() != template.count || !other.is_empty() {
                continue;
            }

            let mut molecule = Molecule::new(template.kind);
            molecule.add_atom(&template.central_role(), id);
            for (i, &n) in outer.iter().enumerate() {
                molecule.add_atom(&template.outer_role(i), n);
            }
            for atom in molecule.atoms() {
                pool.remove(atom);
            }
            found.push(molecule);
        }
        found
    }

    fn parse_carbon_chains(
        &self,
        system: &MolecularSystem,
        order: &[AtomId],
        pool: &mut HashSet<AtomId>,
    ) -> Vec<Molecule> {
        let mut found = Vec::new();
        let mut visited = HashSet::new();
        for &id in order {
            if !pool.contains(&id) || visited.contains(&id) || Self::element(system, id) != Some(Element::C)
            {
                continue;
            }
            let component = self.component(id, pool);
            visited.extend(component.iter().copied());
            if let Some(molecule) = ChainClassifier::new(&self.graph, system, &component).classify() {
                for atom in molecule.atoms() {
                    pool.remove(atom);
                }
                found.push(molecule);
            }
        }
        found
    }

    /// Covalently connected atoms reachable from `start` without leaving `pool`.
    fn component(&self, start: AtomId, pool: &HashSet<AtomId>) -> Vec<AtomId> {
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut component = Vec::new();
        while let Some(id) = queue.pop_front() {
            component.push(id);
            for n in self.graph.bonded_atoms(id, BondKind::Covalent, None) {
                if pool.contains(&n) && seen.insert(n) {
                    queue.push_back(n);
                }
            }
        }
        component
    }
}

/// Recognises a carbon-containing connected component and assigns atom roles.
struct ChainClassifier<'a> {
    graph: &'a BondGraph,
    system: &'a MolecularSystem,
    members: HashSet<AtomId>,
    component: &'a [AtomId],
}

impl<'a> ChainClassifier<'a> {
    fn new(graph: &'a BondGraph, system: &'a MolecularSystem, component: &'a [AtomId]) -> Self {
        Self {
            graph,
            system,
            members: component.iter().copied().collect(),
            component,
        }
    }

    fn of(&self, element: Element) -> Vec<AtomId> {
        self.component
            .iter()
            .copied()
            .filter(|&id| MoleculeAssembler::element(self.system, id) == Some(element))
            .collect()
    }

    fn neighbours(&self, id: AtomId, element: Element) -> Vec<AtomId> {
        self.graph
            .bonded_atoms(id, BondKind::Covalent, Some(element))
            .into_iter()
            .filter(|n| self.members.contains(n))
            .collect()
    }

    fn classify(&self) -> Option<Molecule> {
        let carbons = self.of(Element::C);
        let oxygens = self.of(Element::O);
        let hydrogens = self.of(Element::H);
        if carbons.len() + oxygens.len() + hydrogens.len() != self.component.len() {
            return None;
        }
        match (carbons.len(), oxygens.len()) {
            (1, 1) => self.formaldehyde(carbons[0], hydrogens.len()),
            (3, 4) => self.malonic(&carbons, hydrogens.len()),
            (4, 4) => self.succinic(&carbons, hydrogens.len()),
            _ => None,
        }
    }

    fn formaldehyde(&self, c: AtomId, total_h: usize) -> Option<Molecule> {
        let o = self.neighbours(c, Element::O);
        let h = self.neighbours(c, Element::H);
        if o.len() != 1 || h.len() != 2 || total_h != 2 {
            return None;
        }
        let mut molecule = Molecule::new(MoleculeKind::Formaldehyde);
        molecule.add_atom("C", c);
        molecule.add_atom("O", o[0]);
        molecule.add_atom("H1", h[0]);
        molecule.add_atom("H2", h[1]);
        Some(molecule)
    }

    fn carboxyl(&self, c: AtomId) -> Option<Carboxyl> {
        let oxygens = self.neighbours(c, Element::O);
        if oxygens.len() != 2 {
            return None;
        }
        let protons: Vec<Vec<AtomId>> = oxygens
            .iter()
            .map(|&o| self.neighbours(o, Element::H))
            .collect();
        match (protons[0].as_slice(), protons[1].as_slice()) {
            ([], []) => Some(Carboxyl {
                carbonyl_o: oxygens[0],
                alcohol_o: oxygens[1],
                acid_h: None,
            }),
            ([h], []) => Some(Carboxyl {
                carbonyl_o: oxygens[1],
                alcohol_o: oxygens[0],
                acid_h: Some(*h),
            }),
            ([], [h]) => Some(Carboxyl {
                carbonyl_o: oxygens[0],
                alcohol_o: oxygens[1],
                acid_h: Some(*h),
            }),
            _ => None,
        }
    }

    fn add_carboxyls(molecule: &mut Molecule, groups: [&Carboxyl; 2]) -> usize {
        for (i, group) in groups.iter().enumerate() {
            molecule.add_atom(&format!("O{}", i + 1), group.carbonyl_o);
            molecule.add_atom(&format!("O{}", i + 3), group.alcohol_o);
        }
        let mut acid = 0;
        for (i, group) in groups.iter().enumerate() {
            if let Some(h) = group.acid_h {
                molecule.add_atom(&format!("H{}", i + 1), h);
                acid += 1;
            }
        }
        acid
    }

    fn malonic(&self, carbons: &[AtomId], total_h: usize) -> Option<Molecule> {
        let (&cm, chain) = carbons.iter().find_map(|c| {
            let chain = self.neighbours(*c, Element::C);
            (chain.len() == 2).then_some((c, chain))
        })?;
        let (c1, c2) = (chain[0], chain[1]);
        let first = self.carboxyl(c1)?;
        let second = self.carboxyl(c2)?;
        let methylene = self.neighbours(cm, Element::H);
        if methylene.len() != 2 {
            return None;
        }

        let mut molecule = Molecule::new(MoleculeKind::Malonic(MalonicState::Acid));
        molecule.add_atom("C1", c1);
        molecule.add_atom("CM", cm);
        molecule.add_atom("C2", c2);
        let acid = Self::add_carboxyls(&mut molecule, [&first, &second]);
        molecule.add_atom("H3", methylene[0]);
        molecule.add_atom("H4", methylene[1]);
        if total_h != acid + 2 {
            return None;
        }
        molecule.kind = MoleculeKind::Malonic(match acid {
            2 => MalonicState::Acid,
            1 => MalonicState::Malonate,
            _ => MalonicState::Dimalonate,
        });
        Some(molecule)
    }

    fn succinic(&self, carbons: &[AtomId], total_h: usize) -> Option<Molecule> {
        let (terminal, internal): (Vec<AtomId>, Vec<AtomId>) = carbons
            .iter()
            .copied()
            .partition(|&c| self.neighbours(c, Element::C).len() == 1);
        if terminal.len() != 2
            || internal
                .iter()
                .any(|&c| self.neighbours(c, Element::C).len() != 2)
        {
            return None;
        }

        let c1 = terminal[0];
        let c2 = *self.neighbours(c1, Element::C).first()?;
        let c3 = self
            .neighbours(c2, Element::C)
            .into_iter()
            .find(|&c| c != c1)?;
        let c4 = self
            .neighbours(c3, Element::C)
            .into_iter()
            .find(|&c| c != c2)?;
        if c4 != terminal[1] {
            return None;
        }

        let first = self.carboxyl(c1)?;
        let second = self.carboxyl(c4)?;
        let upper = self.neighbours(c2, Element::H);
        let lower = self.neighbours(c3, Element::H);
        if upper.len() != 2 || lower.len() != 2 {
            return None;
        }

        let mut molecule = Molecule::new(MoleculeKind::SuccinicAcid);
        for (i, c) in [c1, c2, c3, c4].into_iter().enumerate() {
            molecule.add_atom(&format!("C{}", i + 1), c);
        }
        let acid = Self::add_carboxyls(&mut molecule, [&first, &second]);
        for (i, &h) in upper.iter().chain(&lower).enumerate() {
            molecule.add_atom(&format!("H{}", i + 3), h);
        }
        (total_h == acid + 4).then_some(molecule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Element;
    use crate::core::models::cell::PeriodicBox;
    use crate::engine::fixtures;
    use nalgebra::Point3;

    fn assembler() -> MoleculeAssembler {
        MoleculeAssembler::new(TemplateRegistry::default(), BondCriteria::default())
    }

    fn molecule_of(system: &MolecularSystem, kind: MoleculeKind) -> &Molecule {
        system.molecules_of_kind(kind).next().unwrap().1
    }

    #[test]
    fn waters_are_fully_assembled() {
        let mut system = MolecularSystem::new(fixtures::slab_box());
        let mut ids = Vec::new();
        for i in 0..3 {
            ids.push(fixtures::water(&mut system, Point3::new(3.0 * i as f64, 0.0, 10.0), true));
        }

        let report = assembler().reparse(&mut system).unwrap().ensure_complete().unwrap();

        assert_eq!(report.count(MoleculeKind::Water), 3);
        assert_eq!(report.molecule_count(), 3);
        for [o, h1, h2] in ids {
            let atom = system.atom(o).unwrap();
            let water = system.molecule(atom.molecule.unwrap()).unwrap();
            assert_eq!(water.kind, MoleculeKind::Water);
            assert_eq!(water.atom_by_role("O"), Some(o));
            assert!(water.contains(h1) && water.contains(h2));
            assert_eq!(system.atom(h1).unwrap().residue, "h2o");
        }
    }

    #[test]
    fn missing_hydrogen_leaves_unparsed_atoms() {
        let mut system = MolecularSystem::new(fixtures::slab_box());
        fixtures::water(&mut system, Point3::new(0.0, 0.0, 10.0), true);
        let lone = fixtures::push(&mut system, Element::O, Point3::new(5.0, 5.0, 10.0));

        let report = assembler().reparse(&mut system).unwrap();
        assert_eq!(report.count(MoleculeKind::Water), 1);
        assert_eq!(report.unparsed.len(), 1);
        assert_eq!(report.unparsed[0].index, 3);
        assert!(system.atom(lone).unwrap().molecule.is_none());

        let err = report.ensure_complete().unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("1 atom(s)"));
        assert!(message.contains("#3"));
    }

    #[test]
    fn hydronium_and_hydroxide_are_recognised() {
        let mut system = MolecularSystem::new(fixtures::slab_box());
        let o = fixtures::push(&mut system, Element::O, Point3::new(0.0, 0.0, 0.0));
        fixtures::push(&mut system, Element::H, Point3::new(0.98, 0.0, 0.0));
        fixtures::push(&mut system, Element::H, Point3::new(-0.49, 0.85, 0.0));
        fixtures::push(&mut system, Element::H, Point3::new(-0.49, -0.85, 0.0));
        let oh = fixtures::push(&mut system, Element::O, Point3::new(10.0, 0.0, 0.0));
        fixtures::push(&mut system, Element::H, Point3::new(10.97, 0.0, 0.0));

        let report = assembler().reparse(&mut system).unwrap().ensure_complete().unwrap();
        assert_eq!(report.count(MoleculeKind::Hydronium), 1);
        assert_eq!(report.count(MoleculeKind::Hydroxide), 1);
        assert_eq!(system.atom(o).unwrap().residue, "h3o");
        assert_eq!(system.atom(oh).unwrap().residue, "oh");
    }

    #[test]
    fn sulfur_dioxide_is_recognised() {
        let mut system = MolecularSystem::new(fixtures::slab_box());
        let [s, o1, o2] = fixtures::sulfur_dioxide(&mut system, Point3::new(5.0, 5.0, 5.0));
        let report = assembler().reparse(&mut system).unwrap().ensure_complete().unwrap();
        assert_eq!(report.count(MoleculeKind::SulfurDioxide), 1);
        let so2 = molecule_of(&system, MoleculeKind::SulfurDioxide);
        assert_eq!(so2.atom_by_role("S"), Some(s));
        assert_eq!(so2.atom_by_role("O1"), Some(o1));
        assert_eq!(so2.atom_by_role("O2"), Some(o2));
    }

    #[test]
    fn formaldehyde_is_parsed_as_chain() {
        let mut system = MolecularSystem::new(fixtures::slab_box());
        let [c, o, ..] = fixtures::formaldehyde(&mut system, Point3::new(5.0, 5.0, 5.0));
        assembler().reparse(&mut system).unwrap().ensure_complete().unwrap();
        let molecule = molecule_of(&system, MoleculeKind::Formaldehyde);
        assert_eq!(molecule.atom_by_role("C"), Some(c));
        assert_eq!(molecule.atom_by_role("O"), Some(o));
        assert_eq!(molecule.len(), 4);
    }

    #[test]
    fn succinic_acid_roles_follow_connectivity() {
        let mut system = MolecularSystem::new(fixtures::slab_box());
        let ids = fixtures::succinic_acid(&mut system, Point3::new(5.0, 5.0, 5.0));
        let report = assembler().reparse(&mut system).unwrap().ensure_complete().unwrap();
        assert_eq!(report.count(MoleculeKind::SuccinicAcid), 1);

        let molecule = molecule_of(&system, MoleculeKind::SuccinicAcid);
        assert_eq!(molecule.len(), 14);
        for (role, index) in [
            ("C1", 0),
            ("C2", 1),
            ("C3", 2),
            ("C4", 3),
            ("O1", 4),
            ("O2", 5),
            ("O3", 6),
            ("O4", 7),
            ("H1", 8),
            ("H2", 9),
        ] {
            assert_eq!(molecule.atom_by_role(role), Some(ids[index]), "role {role}");
        }
    }

    #[test]
    fn malonic_protonation_state_follows_acid_hydrogens() {
        for (acid, state) in [
            (2, MalonicState::Acid),
            (1, MalonicState::Malonate),
            (0, MalonicState::Dimalonate),
        ] {
            let mut system = MolecularSystem::new(fixtures::slab_box());
            let ids = fixtures::malonic(&mut system, Point3::new(5.0, 5.0, 5.0), acid);
            let report = assembler().reparse(&mut system).unwrap().ensure_complete().unwrap();
            assert_eq!(report.count(MoleculeKind::Malonic(state)), 1);

            let molecule = molecule_of(&system, MoleculeKind::Malonic(state));
            assert_eq!(molecule.atom_by_role("CM"), Some(ids[1]));
            assert_eq!(molecule.len(), ids.len());
        }
    }

    #[test]
    fn carboxylic_hydroxyl_is_not_taken_for_hydroxide() {
        let mut system = MolecularSystem::new(fixtures::slab_box());
        fixtures::succinic_acid(&mut system, Point3::new(5.0, 5.0, 5.0));
        let report = assembler().reparse(&mut system).unwrap();
        assert_eq!(report.count(MoleculeKind::Hydroxide), 0);
    }

    #[test]
    fn unrecognised_chain_is_left_unparsed() {
        let mut system = MolecularSystem::new(fixtures::slab_box());
        fixtures::push(&mut system, Element::C, Point3::new(0.0, 0.0, 0.0));
        fixtures::push(&mut system, Element::C, Point3::new(1.5, 0.0, 0.0));
        let report = assembler().reparse(&mut system).unwrap();
        assert_eq!(report.molecule_count(), 0);
        assert_eq!(report.unparsed.len(), 2);
    }

    #[test]
    fn reparse_replaces_previous_molecules() {
        let mut system = MolecularSystem::new(PeriodicBox::new(20.0, 20.0, 20.0));
        let [o, h1, _] = fixtures::water(&mut system, Point3::new(5.0, 5.0, 5.0), true);
        let mut assembler = assembler();
        assembler.reparse(&mut system).unwrap();
        assert_eq!(system.molecule_count(), 1);

        let mut positions: Vec<Point3<f64>> =
            system.atoms_iter().map(|(_, a)| a.position).collect();
        positions[1] = Point3::new(15.0, 15.0, 15.0);
        system.set_positions(&positions).unwrap();

        let report = assembler.reparse(&mut system).unwrap();
        assert_eq!(system.molecule_count(), 1);
        assert_eq!(report.count(MoleculeKind::Hydroxide), 1);
        assert_eq!(report.unparsed.len(), 1);
        assert!(system.atom(h1).unwrap().molecule.is_none());
        assert!(system.atom(o).unwrap().molecule.is_some());
    }

    #[test]
    fn assemble_without_graph_update_claims_nothing() {
        let mut system = MolecularSystem::new(fixtures::slab_box());
        fixtures::water(&mut system, Point3::new(0.0, 0.0, 10.0), true);
        let assembler = assembler();
        let report = assembler.assemble(&mut system).unwrap();
        assert_eq!(report.molecule_count(), 0);
        assert_eq!(report.unparsed.len(), 3);
    }
}
