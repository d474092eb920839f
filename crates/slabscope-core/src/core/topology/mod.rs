//! # Topology Module
//!
//! Molecule templates that tell the assembler how to recognise simple molecules
//! (a central atom with a fixed number of identical covalent partners) in a flat
//! list of atoms.
//!
//! ## Key Components
//!
//! - [`registry`] - The ordered template registry, with a built-in default and TOML loading
//!
//! ## Usage
//!
//! ```ignore
//! use slabscope::core::topology::registry::TemplateRegistry;
//!
//! let registry = TemplateRegistry::load(Path::new("templates.toml"))?;
//! let water = registry.get("water").unwrap();
//! ```

pub mod registry;
