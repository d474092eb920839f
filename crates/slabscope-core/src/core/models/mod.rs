//! # Core Models Module
//!
//! Plain data structures describing the simulated system: atoms, the molecules the
//! assembler groups them into, the periodic cell, and the arena that owns them all
//! for the length of a trajectory run.
//!
//! ## Key Components
//!
//! - [`atom`] - Atoms and chemical elements
//! - [`molecule`] - Molecule kinds and role-addressable atom groups
//! - [`cell`] - Periodic cell, minimum-image convention and reference-axis unwrapping
//! - [`system`] - The atom/molecule arena
//! - [`ids`] - Slot-map keys for atoms and molecules

pub mod atom;
pub mod cell;
pub mod ids;
pub mod molecule;
pub mod system;
