//! Integration tests for union (any-of) and intersection (all-of) fields.

use std::sync::Arc;

use fieldwork::{
    AllOfField, AnyOfField, ErrorKind, Field, IntField, ObjectField, RecordType, Shape,
    StringField, ToDictOptions, Value,
};
use serde_json::json;

fn value(json: serde_json::Value) -> Value {
    Value::from(json)
}

fn cat() -> Arc<RecordType> {
    RecordType::builder("Cat")
        .field("name", StringField::new().required())
        .field("lives", IntField::new().default_value(9))
        .build()
}

fn dog() -> Arc<RecordType> {
    RecordType::builder("Dog")
        .field("name", StringField::new().required())
        .field("tricks", IntField::new())
        .build()
}

#[test]
fn test_first_matching_alternative_wins() {
    let pet = AnyOfField::new([cat(), dog()]);

    // satisfies both shapes; Cat is declared first
    let result = pet.validate("pet", value(json!({"name": "Tom"}))).unwrap();
    assert_eq!(result.as_record().unwrap().name(), "Cat");
}

#[test]
fn test_implausible_record_alternatives_are_skipped() {
    let pet = AnyOfField::new([cat(), dog()]);

    let result = pet.validate("pet", value(json!({"name": "Rex", "tricks": 3}))).unwrap();
    assert_eq!(result.as_record().unwrap().name(), "Dog");

    let error = pet
        .validate("pet", value(json!({"name": "Nemo", "fins": 2})))
        .unwrap_err();
    assert_eq!(
        error.kind,
        ErrorKind::UnionExhausted {
            alternatives: vec!["Cat".into(), "Dog".into()]
        }
    );
}

#[test]
fn test_plausible_but_invalid_falls_through() {
    let pet = AnyOfField::new([cat(), dog()]);

    // plausible for Cat by keys, but lives must be an integer
    let result = pet.validate("pet", value(json!({"name": "Tom", "lives": "many"})));
    assert_eq!(result.unwrap_err().code(), "any_of_none_matched");
}

#[test]
fn test_mixed_scalar_and_record_alternatives() {
    let owner = AnyOfField::new([Shape::from(IntField::new()), Shape::from(cat())]).to_dict(true);

    assert_eq!(owner.validate("owner", "12".into()).unwrap(), Value::Int(12));
    assert_eq!(
        owner.validate("owner", value(json!({"name": "Tom"}))).unwrap(),
        value(json!({"name": "Tom"}))
    );
}

#[test]
fn test_to_dict_flag_reaches_object_field_alternatives() {
    let pet = AnyOfField::new([Shape::from(ObjectField::new(&cat())), Shape::from(IntField::new())])
        .to_dict(true);

    assert_eq!(
        pet.validate("pet", value(json!({"name": "Tom"}))).unwrap(),
        value(json!({"name": "Tom"}))
    );
    assert_eq!(pet.validate("pet", "3".into()).unwrap(), Value::Int(3));

    let kept = AnyOfField::new([ObjectField::new(&cat())]);
    let result = kept.validate("pet", value(json!({"name": "Tom"}))).unwrap();
    assert_eq!(result.as_record().unwrap().name(), "Cat");
}

#[test]
fn test_any_of_inside_record() {
    let shelter = RecordType::builder("Shelter")
        .field("resident", AnyOfField::new([cat(), dog()]).required())
        .build();

    let record = shelter
        .new(value(json!({"resident": {"name": "Rex", "tricks": 1}})), false)
        .unwrap();
    assert_eq!(
        record.to_json(&ToDictOptions::default()),
        json!({"resident": {"name": "Rex", "tricks": 1}})
    );
}

#[test]
fn test_all_of_validates_each_position() {
    let pair = AllOfField::new([Shape::from(cat()), Shape::from(IntField::new().min_value(0))]);

    let result = pair
        .validate("pair", value(json!([{"name": "Tom"}, "3"])))
        .unwrap();
    let items = result.as_list().unwrap();
    assert_eq!(items[0].as_record().unwrap().name(), "Cat");
    assert_eq!(items[1], Value::Int(3));

    let error = pair
        .validate("pair", value(json!([{"name": "Tom"}, -1])))
        .unwrap_err();
    assert_eq!(error.path.to_string(), "pair[1]");
    assert_eq!(error.code(), "min_value");
}

#[test]
fn test_all_of_length_mismatch() {
    let pair = AllOfField::new([Shape::from(IntField::new()), Shape::from(StringField::new())]);
    let error = pair.validate("pair", value(json!([1]))).unwrap_err();
    assert_eq!(error.kind, ErrorKind::IntersectionCountMismatch { expected: 2, got: 1 });
}

// A leading falsy candidate is a present value, not an absent one.
#[test]
fn test_all_of_accepts_falsy_first_candidate() {
    let pair = AllOfField::new([Shape::from(IntField::new()), Shape::from(StringField::new())])
        .required();
    assert_eq!(
        pair.validate("pair", value(json!([0, "x"]))).unwrap(),
        value(json!([0, "x"]))
    );
}
