use super::criteria::BondCriteria;
use crate::core::models::atom::Element;
use crate::core::models::cell::PeriodicBox;
use crate::core::models::ids::AtomId;
use crate::core::models::system::MolecularSystem;
use crate::core::utils::geometry::cos_angle;
use nalgebra::Point3;
use slotmap::SecondaryMap;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BondKind {
    Covalent,
    HydrogenBond,
    Interaction,
}

#[derive(Debug, Clone)]
struct Node {
    element: Element,
    position: Point3<f64>,
    edges: Vec<(AtomId, BondKind)>,
}

/// An undirected, kind-tagged connectivity graph over a subset of atoms.
///
/// The graph is rebuilt from scratch by every call to [`BondGraph::update`]; no
/// node or edge survives between calls. Every edge is stored on both endpoints.
#[derive(Debug, Clone, Default)]
pub struct BondGraph {
    criteria: BondCriteria,
    nodes: SecondaryMap<AtomId, Node>,
    order: Vec<AtomId>,
}

impl BondGraph {
    pub fn new(criteria: BondCriteria) -> Self {
        Self {
            criteria,
            nodes: SecondaryMap::new(),
            order: Vec::new(),
        }
    }

    pub fn criteria(&self) -> &BondCriteria {
        &self.criteria
    }

    /// Rebuilds the graph over `atoms`, using the current positions in `system`.
    ///
    /// The cost is quadratic in `atoms.len()`, independent of the size of the
    /// system. Ids that are unknown to `system` or repeated are skipped.
    pub fn update(&mut self, system: &MolecularSystem, atoms: &[AtomId]) {
        self.nodes.clear();
        self.order.clear();

        for &id in atoms {
            if self.nodes.contains_key(id) {
                continue;
            }
            let Some(atom) = system.atom(id) else {
                trace!(?id, "Skipping atom that is not part of the system");
                continue;
            };
            self.nodes.insert(
                id,
                Node {
                    element: atom.element,
                    position: atom.position,
                    edges: Vec::new(),
                },
            );
            self.order.push(id);
        }

        let cell = *system.cell();
        let n = self.order.len();
        let distance = |a: &Node, b: &Node| cell.distance(&a.position, &b.position);

        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (self.order[i], self.order[j]);
                let (na, nb) = (&self.nodes[a], &self.nodes[b]);
                if let Some(cutoff) = self.criteria.covalent_cutoff(na.element, nb.element) {
                    if distance(na, nb) < cutoff {
                        self.add_edge(a, b, BondKind::Covalent);
                    }
                }
            }
        }

        for i in 0..n {
            let h = self.order[i];
            if self.nodes[h].element != Element::H {
                continue;
            }
            let donors = self.bonded_atoms(h, BondKind::Covalent, None);
            let donors: Vec<AtomId> = donors
                .into_iter()
                .filter(|&d| self.nodes[d].element.is_hbond_heavy_atom())
                .collect();
            if donors.is_empty() {
                continue;
            }
            for j in 0..n {
                let acceptor = self.order[j];
                if acceptor == h
                    || donors.contains(&acceptor)
                    || !self.nodes[acceptor].element.is_hbond_heavy_atom()
                    || self.has_edge(h, acceptor, None)
                {
                    continue;
                }
                if self.is_hydrogen_bond(&cell, &donors, h, acceptor) {
                    self.add_edge(h, acceptor, BondKind::HydrogenBond);
                }
            }
        }

        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (self.order[i], self.order[j]);
                let (na, nb) = (&self.nodes[a], &self.nodes[b]);
                if let Some(cutoff) = self.criteria.interaction_cutoff(na.element, nb.element) {
                    if distance(na, nb) < cutoff && !self.has_edge(a, b, None) {
                        self.add_edge(a, b, BondKind::Interaction);
                    }
                }
            }
        }

        trace!(
            atoms = n,
            covalent = self.edge_count(BondKind::Covalent),
            hbonds = self.edge_count(BondKind::HydrogenBond),
            interactions = self.edge_count(BondKind::Interaction),
            "Bond graph rebuilt"
        );
    }

    fn is_hydrogen_bond(
        &self,
        cell: &PeriodicBox,
        donors: &[AtomId],
        h: AtomId,
        acceptor: AtomId,
    ) -> bool {
        let h_pos = &self.nodes[h].position;
        let to_acceptor = cell.displacement(h_pos, &self.nodes[acceptor].position);
        if to_acceptor.norm() >= self.criteria.hbond_distance {
            return false;
        }
        donors.iter().any(|&d| {
            let to_donor = cell.displacement(h_pos, &self.nodes[d].position);
            let angle = cos_angle(&to_donor, &to_acceptor).acos().to_degrees();
            angle >= self.criteria.hbond_min_angle
        })
    }

    fn add_edge(&mut self, a: AtomId, b: AtomId, kind: BondKind) {
        if let Some(node) = self.nodes.get_mut(a) {
            node.edges.push((b, kind));
        }
        if let Some(node) = self.nodes.get_mut(b) {
            node.edges.push((a, kind));
        }
    }

    /// Atoms linked to `atom` by edges of `kind`, in insertion order, optionally
    /// restricted to one element. An atom that is not in the graph has no
    /// neighbours.
    pub fn bonded_atoms(&self, atom: AtomId, kind: BondKind, element: Option<Element>) -> Vec<AtomId> {
        let Some(node) = self.nodes.get(atom) else {
            return Vec::new();
        };
        node.edges
            .iter()
            .filter(|(_, k)| *k == kind)
            .map(|&(other, _)| other)
            .filter(|&other| {
                element.is_none_or(|e| self.nodes.get(other).is_some_and(|n| n.element == e))
            })
            .collect()
    }

    /// Whether an edge links `a` and `b`; `None` matches any kind.
    pub fn has_edge(&self, a: AtomId, b: AtomId, kind: Option<BondKind>) -> bool {
        self.nodes.get(a).is_some_and(|node| {
            node.edges
                .iter()
                .any(|&(other, k)| other == b && kind.is_none_or(|kind| kind == k))
        })
    }

    pub fn contains(&self, atom: AtomId) -> bool {
        self.nodes.contains_key(atom)
    }

    pub fn atoms(&self) -> &[AtomId] {
        &self.order
    }

    pub fn edge_count(&self, kind: BondKind) -> usize {
        let ends: usize = self
            .nodes
            .values()
            .map(|node| node.edges.iter().filter(|(_, k)| *k == kind).count())
            .sum();
        ends / 2
    }
}
