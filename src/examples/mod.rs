//! Worked consumer schemas that exercise [crate::ClassMapping] end to end. The
//! record types here are stand-ins for a real renderer's own data — the kind
//! of thing a map loader or unit-stat loader would define for itself — not
//! part of this crate's own grammar.

mod map_definition;

#[cfg(test)]
mod __tests__;

pub use map_definition::{Inner, MapDefinition, Outer};
