use std::collections::HashMap;
use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::error::{ErrorKind, ImplementationError, ParseError};
use crate::parse_state::{ParseState, StringId};
use crate::reader::Reader;
use crate::util::Log;
use crate::value_types::{RealType, ValueType, ValueTypes};

/// Binds a nested schema to a field on `T`, closing over both the inner
/// [ClassMapping] and the accessor that projects `T` down to the field it
/// populates. This is the Rust stand-in for a raw inner-mapping pointer: the
/// language can't hold a map of live `&mut` borrows into disjoint fields of
/// `T` for an entire parse, so the projection is deferred into a closure
/// instead and invoked only once the field is actually being read.
pub trait ObjectBinding<T> {
    fn read<'c>(&self, reader: &mut Reader<'c>, state: &mut ParseState<'c>, target: &mut T) -> Result<(), ParseError>;
}

struct NestedObject<T, Inner> {
    schema: Rc<ClassMapping<Inner>>,
    access: Box<dyn Fn(&mut T) -> &mut Inner>,
}

impl<T, Inner> ObjectBinding<T> for NestedObject<T, Inner> {
    fn read<'c>(&self, reader: &mut Reader<'c>, state: &mut ParseState<'c>, target: &mut T) -> Result<(), ParseError> {
        let inner = (self.access)(target);
        self.schema.read_object(reader, state, inner)
    }
}

/// Where a successfully read value is written. Each variant owns the setter
/// closure supplied when the field was declared.
enum FieldTarget<T> {
    Integer(Box<dyn Fn(&mut T, i32)>),
    Integer64(Box<dyn Fn(&mut T, i64)>),
    Decimal(Box<dyn Fn(&mut T, f32)>),
    Decimal64(Box<dyn Fn(&mut T, f64)>),
    Boolean(Box<dyn Fn(&mut T, bool)>),
    Text(Box<dyn Fn(&mut T, String)>),
    IntegerVec(Box<dyn Fn(&mut T, Vec<i32>)>),
    Integer64Vec(Box<dyn Fn(&mut T, Vec<i64>)>),
    DecimalVec(Box<dyn Fn(&mut T, Vec<f32>)>),
    Decimal64Vec(Box<dyn Fn(&mut T, Vec<f64>)>),
    BooleanVec(Box<dyn Fn(&mut T, Vec<bool>)>),
    TextVec(Box<dyn Fn(&mut T, Vec<String>)>),
    Object(Box<dyn ObjectBinding<T>>),
}

/// One schema field: the set of value types it accepts (and, for arrays, the
/// set of element types it accepts) plus where a successfully read value goes.
pub struct ValueMapping<T> {
    accepted: ValueTypes,
    inner: ValueTypes,
    target: FieldTarget<T>,
}

/// A declarative binding from source-text keys to typed fields on `T`. Built
/// against one particular [ParseState] — the same table that will later
/// intern the document's own keys — so a `ClassMapping` is not portable
/// across independent parses.
pub struct ClassMapping<T> {
    fields: HashMap<StringId, ValueMapping<T>>,
    debug: OnceCell<Log<&'static str>>,
}

impl<T> Default for ClassMapping<T> {
    fn default() -> Self {
        Self {
            fields: HashMap::new(),
            debug: OnceCell::new(),
        }
    }
}

impl<T> ClassMapping<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_log(&self, log: Log<&'static str>) -> Result<(), String> {
        self.debug
            .set(log)
            .map_err(|rejected| format!("Log label {} is already assigned.", rejected))
    }

    fn insert(
        &mut self,
        key: &str,
        state: &mut ParseState,
        mapping: ValueMapping<T>,
    ) -> Result<(), ImplementationError> {
        let id = state.add_string(key);
        if self.fields.contains_key(&id) {
            return Err(ImplementationError::new(
                "ClassMapping::add".to_string(),
                format!("key '{}' is already mapped on this schema", key),
            ));
        }
        self.fields.insert(id, mapping);
        Ok(())
    }

    pub fn add_integer(
        &mut self,
        key: &str,
        state: &mut ParseState,
        assign: impl Fn(&mut T, i32) + 'static,
    ) -> Result<(), ImplementationError> {
        self.insert(
            key,
            state,
            ValueMapping {
                accepted: ValueType::Integer.into(),
                inner: ValueTypes::empty(),
                target: FieldTarget::Integer(Box::new(assign)),
            },
        )
    }

    pub fn add_integer64(
        &mut self,
        key: &str,
        state: &mut ParseState,
        assign: impl Fn(&mut T, i64) + 'static,
    ) -> Result<(), ImplementationError> {
        self.insert(
            key,
            state,
            ValueMapping {
                accepted: ValueType::Integer64.into(),
                inner: ValueTypes::empty(),
                target: FieldTarget::Integer64(Box::new(assign)),
            },
        )
    }

    pub fn add_decimal(
        &mut self,
        key: &str,
        state: &mut ParseState,
        assign: impl Fn(&mut T, f32) + 'static,
    ) -> Result<(), ImplementationError> {
        self.insert(
            key,
            state,
            ValueMapping {
                accepted: ValueType::Decimal.into(),
                inner: ValueTypes::empty(),
                target: FieldTarget::Decimal(Box::new(assign)),
            },
        )
    }

    pub fn add_decimal64(
        &mut self,
        key: &str,
        state: &mut ParseState,
        assign: impl Fn(&mut T, f64) + 'static,
    ) -> Result<(), ImplementationError> {
        self.insert(
            key,
            state,
            ValueMapping {
                accepted: ValueType::Decimal64.into(),
                inner: ValueTypes::empty(),
                target: FieldTarget::Decimal64(Box::new(assign)),
            },
        )
    }

    pub fn add_boolean(
        &mut self,
        key: &str,
        state: &mut ParseState,
        assign: impl Fn(&mut T, bool) + 'static,
    ) -> Result<(), ImplementationError> {
        self.insert(
            key,
            state,
            ValueMapping {
                accepted: ValueType::Boolean.into(),
                inner: ValueTypes::empty(),
                target: FieldTarget::Boolean(Box::new(assign)),
            },
        )
    }

    /// Accepts either a quoted string or a bare identifier value; both copy
    /// their text into the target field.
    pub fn add_string(
        &mut self,
        key: &str,
        state: &mut ParseState,
        assign: impl Fn(&mut T, String) + 'static,
    ) -> Result<(), ImplementationError> {
        let accepted: ValueTypes = [ValueType::String, ValueType::Identifier].into_iter().collect();
        self.insert(
            key,
            state,
            ValueMapping {
                accepted,
                inner: ValueTypes::empty(),
                target: FieldTarget::Text(Box::new(assign)),
            },
        )
    }

    pub fn add_integer_vec(
        &mut self,
        key: &str,
        state: &mut ParseState,
        assign: impl Fn(&mut T, Vec<i32>) + 'static,
    ) -> Result<(), ImplementationError> {
        self.insert(
            key,
            state,
            ValueMapping {
                accepted: ValueType::Array.into(),
                inner: ValueType::Integer.into(),
                target: FieldTarget::IntegerVec(Box::new(assign)),
            },
        )
    }

    pub fn add_integer64_vec(
        &mut self,
        key: &str,
        state: &mut ParseState,
        assign: impl Fn(&mut T, Vec<i64>) + 'static,
    ) -> Result<(), ImplementationError> {
        self.insert(
            key,
            state,
            ValueMapping {
                accepted: ValueType::Array.into(),
                inner: ValueType::Integer64.into(),
                target: FieldTarget::Integer64Vec(Box::new(assign)),
            },
        )
    }

    pub fn add_decimal_vec(
        &mut self,
        key: &str,
        state: &mut ParseState,
        assign: impl Fn(&mut T, Vec<f32>) + 'static,
    ) -> Result<(), ImplementationError> {
        self.insert(
            key,
            state,
            ValueMapping {
                accepted: ValueType::Array.into(),
                inner: ValueType::Decimal.into(),
                target: FieldTarget::DecimalVec(Box::new(assign)),
            },
        )
    }

    pub fn add_decimal64_vec(
        &mut self,
        key: &str,
        state: &mut ParseState,
        assign: impl Fn(&mut T, Vec<f64>) + 'static,
    ) -> Result<(), ImplementationError> {
        self.insert(
            key,
            state,
            ValueMapping {
                accepted: ValueType::Array.into(),
                inner: ValueType::Decimal64.into(),
                target: FieldTarget::Decimal64Vec(Box::new(assign)),
            },
        )
    }

    /// Stored as a plain, unpacked `Vec<bool>` — there is no bitmask packing
    /// in this implementation.
    pub fn add_boolean_vec(
        &mut self,
        key: &str,
        state: &mut ParseState,
        assign: impl Fn(&mut T, Vec<bool>) + 'static,
    ) -> Result<(), ImplementationError> {
        self.insert(
            key,
            state,
            ValueMapping {
                accepted: ValueType::Array.into(),
                inner: ValueType::Boolean.into(),
                target: FieldTarget::BooleanVec(Box::new(assign)),
            },
        )
    }

    pub fn add_string_vec(
        &mut self,
        key: &str,
        state: &mut ParseState,
        assign: impl Fn(&mut T, Vec<String>) + 'static,
    ) -> Result<(), ImplementationError> {
        let inner: ValueTypes = [ValueType::String, ValueType::Identifier].into_iter().collect();
        self.insert(
            key,
            state,
            ValueMapping {
                accepted: ValueType::Array.into(),
                inner,
                target: FieldTarget::TextVec(Box::new(assign)),
            },
        )
    }

    pub fn add_object<Inner: 'static>(
        &mut self,
        key: &str,
        state: &mut ParseState,
        schema: Rc<ClassMapping<Inner>>,
        access: impl Fn(&mut T) -> &mut Inner + 'static,
    ) -> Result<(), ImplementationError> {
        self.insert(
            key,
            state,
            ValueMapping {
                accepted: ValueType::Object.into(),
                inner: ValueTypes::empty(),
                target: FieldTarget::Object(Box::new(NestedObject { schema, access: Box::new(access) })),
            },
        )
    }

    /// Reads the property loop for one object: the root document is read this
    /// way directly (it has no surrounding brackets), while a nested object is
    /// read between a `begin_read_object`/`end_read_object` pair.
    pub fn read_object<'c>(
        &self,
        reader: &mut Reader<'c>,
        state: &mut ParseState<'c>,
        target: &mut T,
    ) -> Result<(), ParseError> {
        while let Some((key, property_type)) = reader.next_property(state)? {
            let mapping = self.fields.get(&key).ok_or_else(|| {
                let key_text = state.lookup(key).unwrap_or("<unknown>").to_string();
                ParseError::new(
                    ErrorKind::UnknownKeyError,
                    format!("found unknown identifier '{}'", key_text),
                    reader.position(),
                )
            })?;

            if !mapping.accepted.has_real_type(property_type) {
                let key_text = state.lookup(key).unwrap_or("<unknown>").to_string();
                return Err(ParseError::new(
                    ErrorKind::TypeMismatchError,
                    format!("parsed type {:?} is invalid for property '{}'", property_type, key_text),
                    reader.position(),
                ));
            }

            self.read_value(reader, state, mapping, property_type, target)?;
            self.trace("read property");
        }
        Ok(())
    }

    fn read_value<'c>(
        &self,
        reader: &mut Reader<'c>,
        state: &mut ParseState<'c>,
        mapping: &ValueMapping<T>,
        property_type: RealType,
        target: &mut T,
    ) -> Result<(), ParseError> {
        match property_type {
            RealType::Number => self.read_number_value(reader, mapping, target),
            RealType::String => {
                let id = reader.read_string(state)?;
                self.assign_text(mapping, state, id, target, reader)
            }
            RealType::Identifier => {
                let id = reader.read_identifier(state)?;
                self.assign_text(mapping, state, id, target, reader)
            }
            RealType::Boolean => {
                let value = reader.read_boolean()?;
                match &mapping.target {
                    FieldTarget::Boolean(assign) => {
                        assign(target, value);
                        Ok(())
                    }
                    _ => Err(ParseError::new(
                        ErrorKind::InvalidState,
                        "boolean value read for a non-boolean mapping".to_string(),
                        reader.position(),
                    )),
                }
            }
            RealType::ObjectOrArray => {
                if mapping.accepted.has_type(ValueType::Object) {
                    self.read_object_value(reader, state, mapping, target)
                } else if mapping.accepted.has_type(ValueType::Array) {
                    self.read_array_value(reader, state, mapping, target)
                } else {
                    Err(ParseError::new(
                        ErrorKind::Unsupported,
                        "attempted to read an object or array without a mapping for it".to_string(),
                        reader.position(),
                    ))
                }
            }
        }
    }

    /// Numeric priority order: `Integer` before `Integer64` before `Decimal`
    /// before `Decimal64`. Since every scalar field built through this type's
    /// own `add_*` constructors accepts exactly one numeric type, at most one
    /// of these arms can ever match for a given mapping; the ordering still
    /// documents the intended precedence for a mapping built to accept more
    /// than one.
    fn read_number_value(
        &self,
        reader: &mut Reader,
        mapping: &ValueMapping<T>,
        target: &mut T,
    ) -> Result<(), ParseError> {
        match &mapping.target {
            FieldTarget::Integer(assign) if mapping.accepted.has_type(ValueType::Integer) => {
                assign(target, reader.read_integer()?);
                Ok(())
            }
            FieldTarget::Integer64(assign) if mapping.accepted.has_type(ValueType::Integer64) => {
                assign(target, reader.read_integer64()?);
                Ok(())
            }
            FieldTarget::Decimal(assign) if mapping.accepted.has_type(ValueType::Decimal) => {
                assign(target, reader.read_decimal()?);
                Ok(())
            }
            FieldTarget::Decimal64(assign) if mapping.accepted.has_type(ValueType::Decimal64) => {
                assign(target, reader.read_decimal64()?);
                Ok(())
            }
            _ => Err(ParseError::new(
                ErrorKind::TypeMismatchError,
                "no matching numeric target for this property".to_string(),
                reader.position(),
            )),
        }
    }

    fn assign_text(
        &self,
        mapping: &ValueMapping<T>,
        state: &ParseState,
        id: StringId,
        target: &mut T,
        reader: &Reader,
    ) -> Result<(), ParseError> {
        match &mapping.target {
            FieldTarget::Text(assign) => {
                assign(target, state.lookup(id)?.to_string());
                Ok(())
            }
            _ => Err(ParseError::new(
                ErrorKind::InvalidState,
                "string/identifier value read for a non-text mapping".to_string(),
                reader.position(),
            )),
        }
    }

    fn read_object_value<'c>(
        &self,
        reader: &mut Reader<'c>,
        state: &mut ParseState<'c>,
        mapping: &ValueMapping<T>,
        target: &mut T,
    ) -> Result<(), ParseError> {
        let binding = match &mapping.target {
            FieldTarget::Object(binding) => binding,
            _ => {
                return Err(ParseError::new(
                    ErrorKind::InvalidState,
                    "object value read for a non-object mapping".to_string(),
                    reader.position(),
                ))
            }
        };
        reader.begin_read_object()?;
        binding.read(reader, state, target)?;
        reader.end_read_object()?;
        Ok(())
    }

    fn array_type_mismatch(reader: &Reader, expected: RealType, found: RealType) -> ParseError {
        ParseError::new(
            ErrorKind::TypeMismatchError,
            format!("expected an array value of type {:?} but found {:?}", expected, found),
            reader.position(),
        )
    }

    fn check_array_element(
        reader: &Reader,
        inner: ValueTypes,
        expected: RealType,
        found: RealType,
    ) -> Result<(), ParseError> {
        if found == RealType::ObjectOrArray {
            return Err(ParseError::new(
                ErrorKind::Unsupported,
                "attempted to read an object or array as an array element".to_string(),
                reader.position(),
            ));
        }
        if !inner.has_real_type(found) {
            return Err(Self::array_type_mismatch(reader, expected, found));
        }
        Ok(())
    }

    /// Element-type priority order: `Integer`, `Integer64`, `Decimal`,
    /// `Decimal64`, `Boolean`, `String`, `Identifier` — matching
    /// `add_string_vec`'s acceptance of either textual real type into one
    /// `Vec<String>`. An array element that is itself an object or array is
    /// always `Unsupported`: arrays never nest.
    fn read_array_value<'c>(
        &self,
        reader: &mut Reader<'c>,
        state: &mut ParseState<'c>,
        mapping: &ValueMapping<T>,
        target: &mut T,
    ) -> Result<(), ParseError> {
        reader.begin_read_array()?;
        match &mapping.target {
            FieldTarget::IntegerVec(assign) => {
                let mut values = Vec::new();
                while let Some(value_type) = reader.next_array_value()? {
                    Self::check_array_element(reader, mapping.inner, RealType::Number, value_type)?;
                    values.push(reader.read_integer()?);
                }
                assign(target, values);
            }
            FieldTarget::Integer64Vec(assign) => {
                let mut values = Vec::new();
                while let Some(value_type) = reader.next_array_value()? {
                    Self::check_array_element(reader, mapping.inner, RealType::Number, value_type)?;
                    values.push(reader.read_integer64()?);
                }
                assign(target, values);
            }
            FieldTarget::DecimalVec(assign) => {
                let mut values = Vec::new();
                while let Some(value_type) = reader.next_array_value()? {
                    Self::check_array_element(reader, mapping.inner, RealType::Number, value_type)?;
                    values.push(reader.read_decimal()?);
                }
                assign(target, values);
            }
            FieldTarget::Decimal64Vec(assign) => {
                let mut values = Vec::new();
                while let Some(value_type) = reader.next_array_value()? {
                    Self::check_array_element(reader, mapping.inner, RealType::Number, value_type)?;
                    values.push(reader.read_decimal64()?);
                }
                assign(target, values);
            }
            FieldTarget::BooleanVec(assign) => {
                let mut values = Vec::new();
                while let Some(value_type) = reader.next_array_value()? {
                    Self::check_array_element(reader, mapping.inner, RealType::Boolean, value_type)?;
                    values.push(reader.read_boolean()?);
                }
                assign(target, values);
            }
            FieldTarget::TextVec(assign) => {
                let mut values = Vec::new();
                while let Some(value_type) = reader.next_array_value()? {
                    let id = match value_type {
                        RealType::String => reader.read_string(state)?,
                        RealType::Identifier => reader.read_identifier(state)?,
                        RealType::ObjectOrArray => {
                            return Err(ParseError::new(
                                ErrorKind::Unsupported,
                                "attempted to read an object or array as an array element".to_string(),
                                reader.position(),
                            ))
                        }
                        other => return Err(Self::array_type_mismatch(reader, RealType::String, other)),
                    };
                    values.push(state.lookup(id)?.to_string());
                }
                assign(target, values);
            }
            FieldTarget::Object(_) => {
                return Err(ParseError::new(
                    ErrorKind::Unsupported,
                    "arrays of objects are not supported".to_string(),
                    reader.position(),
                ))
            }
            _ => {
                return Err(ParseError::new(
                    ErrorKind::InvalidState,
                    "array value read for a scalar mapping".to_string(),
                    reader.position(),
                ))
            }
        }
        reader.end_read_array()?;
        Ok(())
    }

    fn trace(&self, message: &str) {
        #[cfg(debug_assertions)]
        if let Some(log) = self.debug.get() {
            if log.order() >= Log::Success(()).order() {
                println!("[{}; ClassMapping] {}", log, message);
            }
        }
        #[cfg(not(debug_assertions))]
        let _ = message;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Code;

    #[derive(Debug, Default, PartialEq)]
    struct Target {
        count: i32,
        names: Vec<String>,
    }

    fn schema(state: &mut ParseState) -> ClassMapping<Target> {
        let mut schema = ClassMapping::new();
        schema.add_integer("count", state, |t, v| t.count = v).unwrap();
        schema.add_string_vec("names", state, |t, v| t.names = v).unwrap();
        schema
    }

    #[test]
    fn duplicate_key_is_rejected_at_schema_build_time() {
        let mut state = ParseState::new("");
        let mut schema = ClassMapping::<Target>::new();
        schema.add_integer("count", &mut state, |t, v| t.count = v).unwrap();
        let err = schema
            .add_integer("count", &mut state, |t, v| t.count = v)
            .unwrap_err();
        assert!(err.to_string().contains("count"));
    }

    #[test]
    fn string_and_identifier_values_both_populate_a_text_vec() {
        let text = r#"names = { alice "bob" carol }"#;
        let code = Code::from(text);
        let mut state = ParseState::new(text);
        let mut reader = Reader::new(&code);
        let schema = schema(&mut state);
        let mut target = Target::default();
        schema.read_object(&mut reader, &mut state, &mut target).unwrap();
        assert_eq!(target.names, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn nested_array_in_an_array_is_unsupported() {
        let text = "names = { { 1 2 } }";
        let code = Code::from(text);
        let mut state = ParseState::new(text);
        let mut reader = Reader::new(&code);
        let schema = schema(&mut state);
        let mut target = Target::default();
        let err = schema.read_object(&mut reader, &mut state, &mut target).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unsupported);
    }

    #[test]
    fn array_element_type_mismatch_is_reported() {
        let text = r#"names = { 1 2 }"#;
        let code = Code::from(text);
        let mut state = ParseState::new(text);
        let mut reader = Reader::new(&code);
        let schema = schema(&mut state);
        let mut target = Target::default();
        let err = schema.read_object(&mut reader, &mut state, &mut target).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatchError);
    }
}
