use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::{json, Value};
use stowage_container::coerce::{convert, enum_from_int, exact, widen};
use stowage_container::{resolve, resolve_as, SerialError, CASCADE};
use stowage_model::{FieldHint, FieldType};

fn hint(field_type: FieldType) -> FieldHint {
    FieldHint::of(field_type)
}

fn modes() -> FieldHint {
    FieldHint::enumeration(&["Idle", "Active", "Overdrive"])
}

// ── Table ────────────────────────────────────────────────────────

#[test]
fn cascade_order_is_fixed() {
    let names: Vec<_> = CASCADE.iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["exact", "convert", "widen", "enum_from_int"]);
}

// ── exact ────────────────────────────────────────────────────────

#[test]
fn exact_accepts_matching_shapes_only() {
    assert_eq!(exact("7", &hint(FieldType::Int)), Some(json!(7)));
    assert_eq!(exact("7.5", &hint(FieldType::Int)), None);
    assert_eq!(exact("7", &hint(FieldType::Float)), Some(json!(7)));
    assert_eq!(exact("true", &hint(FieldType::Bool)), Some(json!(true)));
    assert_eq!(exact("\"hi\"", &hint(FieldType::Text)), Some(json!("hi")));
    assert_eq!(exact("hi", &hint(FieldType::Text)), None);
    assert_eq!(exact("[1,2]", &hint(FieldType::Structured)), Some(json!([1, 2])));
}

#[test]
fn exact_checks_enum_variant_names() {
    assert_eq!(exact("\"Active\"", &modes()), Some(json!("Active")));
    assert_eq!(exact("\"Boosted\"", &modes()), None);
    assert_eq!(exact("1", &modes()), None);
}

// ── convert ──────────────────────────────────────────────────────

#[test]
fn convert_parses_numeric_text() {
    assert_eq!(convert("\" 42 \"", &hint(FieldType::Int)), Some(json!(42)));
    assert_eq!(convert("\"2.5\"", &hint(FieldType::Float)), Some(json!(2.5)));
    assert_eq!(convert("\"NaN\"", &hint(FieldType::Float)), None);
}

#[test]
fn convert_moves_between_bool_and_number() {
    assert_eq!(convert("true", &hint(FieldType::Int)), Some(json!(1)));
    assert_eq!(convert("false", &hint(FieldType::Float)), Some(json!(0.0)));
    assert_eq!(convert("0", &hint(FieldType::Bool)), Some(json!(false)));
    assert_eq!(convert("\"TRUE\"", &hint(FieldType::Bool)), Some(json!(true)));
}

#[test]
fn convert_renders_scalars_as_text() {
    assert_eq!(convert("31", &hint(FieldType::Text)), Some(json!("31")));
    assert_eq!(convert("false", &hint(FieldType::Text)), Some(json!("false")));
    assert_eq!(convert("bare words", &hint(FieldType::Text)), Some(json!("bare words")));
    assert_eq!(convert("{\"a\":1}", &hint(FieldType::Text)), None);
}

#[test]
fn convert_matches_enum_names_case_insensitively() {
    assert_eq!(convert("\"overdrive\"", &modes()), Some(json!("Overdrive")));
    assert_eq!(convert("\"boosted\"", &modes()), None);
}

#[test]
fn convert_leaves_structured_alone() {
    assert_eq!(convert("\"[1]\"", &hint(FieldType::Structured)), None);
}

// ── widen ────────────────────────────────────────────────────────

#[test]
fn widen_accepts_integral_floats_and_numeric_text() {
    assert_eq!(widen("12.0", &hint(FieldType::Int)), Some(json!(12)));
    assert_eq!(widen("\"-3.0\"", &hint(FieldType::Int)), Some(json!(-3)));
    assert_eq!(widen("12.5", &hint(FieldType::Int)), None);
    assert_eq!(widen("5", &hint(FieldType::Float)), Some(json!(5.0)));
}

#[test]
fn widen_rejects_values_outside_i64() {
    assert_eq!(widen(&u64::MAX.to_string(), &hint(FieldType::Int)), None);
    assert_eq!(widen("1e300", &hint(FieldType::Int)), None);
}

#[test]
fn widen_ignores_non_numeric_targets() {
    assert_eq!(widen("1", &hint(FieldType::Bool)), None);
    assert_eq!(widen("1", &modes()), None);
}

// ── enum_from_int ────────────────────────────────────────────────

#[test]
fn enum_from_int_selects_variant_by_ordinal() {
    assert_eq!(enum_from_int("0", &modes()), Some(json!("Idle")));
    assert_eq!(enum_from_int("2", &modes()), Some(json!("Overdrive")));
    assert_eq!(enum_from_int("\"1\"", &modes()), Some(json!("Active")));
}

#[test]
fn enum_from_int_rejects_out_of_range_ordinals() {
    assert_eq!(enum_from_int("3", &modes()), None);
    assert_eq!(enum_from_int("-1", &modes()), None);
    assert_eq!(enum_from_int("1", &hint(FieldType::Int)), None);
}

// ── resolve ──────────────────────────────────────────────────────

#[test]
fn resolve_stops_at_first_strategy() {
    assert_eq!(resolve("7", &hint(FieldType::Int)).unwrap(), json!(7));
    assert_eq!(resolve("2", &modes()).unwrap(), json!("Overdrive"));
}

#[test]
fn resolve_fails_when_nothing_applies() {
    let err = resolve("{\"x\":1}", &hint(FieldType::Int)).unwrap_err();
    assert!(matches!(err, SerialError::NoCoercion { field_type: FieldType::Int, .. }));
}

#[derive(Debug, PartialEq, Deserialize)]
enum Mode {
    Idle,
    Active,
    Overdrive,
}

#[test]
fn resolve_as_decodes_enum_from_ordinal() {
    assert_eq!(resolve_as::<Mode>("1", &modes()), Some(Mode::Active));
}

#[test]
fn resolve_as_skips_candidates_the_type_rejects() {
    // 300 fits the Int shape but not a u8; no later candidate does either.
    assert_eq!(resolve_as::<u8>("300", &hint(FieldType::Int)), None);
    assert_eq!(resolve_as::<u8>("\"30\"", &hint(FieldType::Int)), Some(30));
    assert_eq!(resolve_as::<Value>("null", &hint(FieldType::Structured)), Some(Value::Null));
}
