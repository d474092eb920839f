//! Per-frame connectivity between atoms.
//!
//! [`bond_graph::BondGraph`] is rebuilt from geometric criteria every time it is
//! updated; [`criteria::BondCriteria`] holds the element-pair cutoffs and the
//! hydrogen-bond geometry it applies.

pub mod bond_graph;
pub mod criteria;
