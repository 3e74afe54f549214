//! End-to-end scenarios against the worked [crate::examples::MapDefinition]
//! schema, covering the literal examples from the grammar's scenario list.

use crate::examples::{MapDefinition, Outer};
use crate::util::Code;
use crate::{ErrorKind, ParseState, Reader};

fn parse_map(text: &str) -> Result<MapDefinition, crate::ParseError> {
    let code = Code::from(text);
    let mut state = ParseState::new(text);
    let mut reader = Reader::new(&code);
    let schema = MapDefinition::schema(&mut state).unwrap();
    let mut target = MapDefinition::default();
    schema.read_object(&mut reader, &mut state, &mut target)?;
    Ok(target)
}

#[test]
fn s1_minimal_map_definition() {
    let text = r#"
        provinces = "provinces.png"
        topology = "topology.png"
        wrap_x = yes
        sea_starts = { 1 4 9 }
    "#;
    let parsed = parse_map(text).unwrap();
    assert_eq!(parsed.provinces, "provinces.png");
    assert_eq!(parsed.topology, "topology.png");
    assert!(parsed.wrap_x);
    assert_eq!(parsed.sea_starts, vec![1, 4, 9]);
    assert_eq!(parsed.rivers, "");
    assert_eq!(parsed.adjacencies, "");
    assert!(parsed.lakes.is_empty());
}

#[test]
fn s2_comments_and_bom_are_skipped() {
    let text = "\u{feff}# header\nwrap_x = no # trailing\n";
    let parsed = parse_map(text).unwrap();
    assert!(!parsed.wrap_x);
}

#[test]
fn s3_unknown_key_is_reported_with_its_name_and_position() {
    let text = r#"
        provinces = "p.png"
        unknown_key = 3
    "#;
    let err = parse_map(text).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownKeyError);
    assert!(err.message.contains("unknown_key"));
}

#[test]
fn s4_type_mismatch_on_boolean_field() {
    let text = "wrap_x = 3";
    let err = parse_map(text).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeMismatchError);
}

#[test]
fn s5_malformed_number_is_a_tokenizer_error() {
    // `count` isn't a MapDefinition field, but the malformed number is caught
    // by the tokenizer before the schema ever gets to report UnknownKeyError.
    let text = "count = 15.";
    let err = parse_map(text).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TokenizerError);
}

#[test]
fn s6_nested_object_is_populated_recursively() {
    let text = "outer = { inner_a = 1 inner_b = \"x\" }";
    let code = Code::from(text);
    let mut state = ParseState::new(text);
    let mut reader = Reader::new(&code);
    let schema = MapDefinition::outer_schema(&mut state).unwrap();
    let mut target = Outer::default();
    schema.read_object(&mut reader, &mut state, &mut target).unwrap();
    assert_eq!(target.inner.inner_a, 1);
    assert_eq!(target.inner.inner_b, "x");
}

#[test]
fn type_isolation_stops_at_the_failing_property() {
    // fields read before the mismatch keep their values; nothing after is touched.
    let text = r#"
        provinces = "p.png"
        wrap_x = 3
        topology = "t.png"
    "#;
    let code = Code::from(text);
    let mut state = ParseState::new(text);
    let mut reader = Reader::new(&code);
    let schema = MapDefinition::schema(&mut state).unwrap();
    let mut target = MapDefinition::default();
    let err = schema.read_object(&mut reader, &mut state, &mut target).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeMismatchError);
    assert_eq!(target.provinces, "p.png");
    assert_eq!(target.topology, "");
}
