//! A stand-in for the kind of record a real terrain/map loader would define for
//! itself: plain data plus a [ClassMapping] built once against the `ParseState`
//! that will parse the document. None of this is part of the crate's own
//! grammar — it exists so the engine in [crate::class_mapping] has a realistic
//! consumer to exercise in tests.

use std::rc::Rc;

use crate::{ClassMapping, ImplementationError, ParseState};

/// An object-valued field whose own schema is read recursively.
#[derive(Debug, Default, PartialEq)]
pub struct Inner {
    pub inner_a: i32,
    pub inner_b: String,
}

impl Inner {
    pub fn schema(state: &mut ParseState) -> Result<ClassMapping<Inner>, ImplementationError> {
        let mut schema = ClassMapping::new();
        schema.add_integer("inner_a", state, |t, v| t.inner_a = v)?;
        schema.add_string("inner_b", state, |t, v| t.inner_b = v)?;
        Ok(schema)
    }
}

/// A minimal map definition: image paths, a wrap flag, and the sea/lake
/// start-point lists, plus one nested record to exercise `add_object`.
#[derive(Debug, Default, PartialEq)]
pub struct MapDefinition {
    pub provinces: String,
    pub topology: String,
    pub rivers: String,
    pub adjacencies: String,
    pub wrap_x: bool,
    pub sea_starts: Vec<i32>,
    pub lakes: Vec<i32>,
    pub outer: Outer,
}

#[derive(Debug, Default, PartialEq)]
pub struct Outer {
    pub inner: Inner,
}

impl MapDefinition {
    /// Builds the schema for a [MapDefinition] against `state`, the same
    /// `ParseState` that will later parse the document the schema is used on.
    pub fn schema(state: &mut ParseState) -> Result<ClassMapping<MapDefinition>, ImplementationError> {
        let mut schema = ClassMapping::new();
        schema.add_string("provinces", state, |t, v| t.provinces = v)?;
        schema.add_string("topology", state, |t, v| t.topology = v)?;
        schema.add_string("rivers", state, |t, v| t.rivers = v)?;
        schema.add_string("adjacencies", state, |t, v| t.adjacencies = v)?;
        schema.add_boolean("wrap_x", state, |t, v| t.wrap_x = v)?;
        schema.add_integer_vec("sea_starts", state, |t, v| t.sea_starts = v)?;
        schema.add_integer_vec("lakes", state, |t, v| t.lakes = v)?;
        Ok(schema)
    }

    /// Builds an `outer`-nesting schema (`outer = { inner_a = .. inner_b = .. }`)
    /// over an independent `Inner` schema, exercising `add_object`.
    pub fn outer_schema(state: &mut ParseState) -> Result<ClassMapping<Outer>, ImplementationError> {
        let inner_schema = Rc::new(Inner::schema(state)?);
        let mut schema = ClassMapping::new();
        schema.add_object("inner", state, inner_schema, |t: &mut Outer| &mut t.inner)?;
        Ok(schema)
    }
}
