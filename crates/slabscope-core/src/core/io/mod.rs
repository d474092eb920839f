//! Trajectory input and analysis output.
//!
//! Frames reach the engine through the [`traits::FrameSource`] trait, implemented
//! for multi-frame XYZ files ([`xyz`]) and in-memory position sets ([`memory`]).
//! Each analysis writes its results through an [`sink::OutputSink`].

pub mod memory;
pub mod sink;
pub mod traits;
pub mod xyz;
