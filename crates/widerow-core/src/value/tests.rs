use super::*;

#[test]
fn conversions_pick_the_matching_variant() {
    assert_eq!(Value::from("abc"), Value::Text("abc".to_string()));
    assert_eq!(Value::from(7_i32), Value::Int(7));
    assert_eq!(Value::from(7_u32), Value::Int(7));
    assert_eq!(Value::from(true), Value::Bool(true));
    assert_eq!(Value::from(vec![1u8, 2]), Value::Blob(vec![1, 2]));
    assert_eq!(Value::from(0.5_f64), Value::Double(0.5));
}

#[test]
fn accessors_only_match_their_variant() {
    assert_eq!(Value::Int(3).as_int(), Some(3));
    assert_eq!(Value::Text("3".to_string()).as_int(), None);
    assert_eq!(Value::Text("x".to_string()).as_text(), Some("x"));
    assert_eq!(Value::Bool(false).as_text(), None);
    assert_eq!(Value::blob([0u8; 4]).kind(), "blob");
}

#[test]
fn sentinels_order_around_every_concrete_key() {
    let mut cells = vec![
        KeyValue::InfMax,
        KeyValue::Text("b".to_string()),
        KeyValue::Int(i64::MAX),
        KeyValue::InfMin,
        KeyValue::Int(i64::MIN),
    ];
    cells.sort();

    assert_eq!(cells.first(), Some(&KeyValue::InfMin));
    assert_eq!(cells.last(), Some(&KeyValue::InfMax));
    assert!(KeyValue::Int(1) < KeyValue::Int(2));
}

#[test]
fn sentinels_have_no_row_value() {
    assert!(KeyValue::InfMin.is_sentinel());
    assert_eq!(KeyValue::InfMax.into_value(), None);
    assert_eq!(KeyValue::from("k").into_value(), Some(Value::from("k")));
    assert_eq!(KeyValue::from(5_i64).into_value(), Some(Value::Int(5)));
}

#[test]
fn display_labels() {
    assert_eq!(KeyValue::InfMin.to_string(), "INF_MIN");
    assert_eq!(KeyValue::InfMax.to_string(), "INF_MAX");
    assert_eq!(Value::blob([1u8, 2, 3]).to_string(), "blob(3 bytes)");
    assert_eq!(Value::from("a").to_string(), "\"a\"");
}

#[test]
fn blob_serializes_as_bytes() {
    let json = serde_json::to_string(&Value::blob([1u8, 2])).expect("value should serialize");
    assert_eq!(json, r#"{"Blob":[1,2]}"#);

    let back: Value = serde_json::from_str(&json).expect("value should deserialize");
    assert_eq!(back, Value::blob([1u8, 2]));
}
