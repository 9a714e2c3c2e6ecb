//! Property-based test generators using proptest.

use proptest::prelude::*;
use rowmap_core::value::{Row, Value};

/// Strategy for valid field names (lower camel case, as entity
/// declarations use them).
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-zA-Z0-9]{0,15}").expect("valid regex")
}

/// Strategy for scalar values, the kind that can appear in a statement
/// bind. Never generates `Array` or `Map`.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        1 => Just(Value::Null),
        2 => any::<bool>().prop_map(Value::Bool),
        4 => any::<i64>().prop_map(Value::Integer),
        2 => any::<f64>().prop_map(Value::Float),
        4 => "[ -~]{0,32}".prop_map(Value::Text),
        1 => (0i64..4_000_000_000).prop_map(Value::Timestamp),
    ]
}

/// Strategy for scalar values that are not empty, so entity construction
/// will keep them.
pub fn present_value_strategy() -> impl Strategy<Value = Value> {
    scalar_value_strategy().prop_filter("value must not be empty", |v| !v.is_empty())
}

/// Strategy for flat rows keyed by field names.
pub fn row_strategy(max_fields: usize) -> impl Strategy<Value = Row> {
    prop::collection::btree_map(field_name_strategy(), scalar_value_strategy(), 0..max_fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn scalar_values_are_scalar(value in scalar_value_strategy()) {
            prop_assert!(value.is_scalar());
        }

        #[test]
        fn binds_stay_scalar(value in scalar_value_strategy()) {
            let bind = value.into_bind();
            prop_assert!(bind.is_scalar());
            prop_assert!(!matches!(bind, Value::Bool(_) | Value::Timestamp(_)));
        }

        #[test]
        fn present_values_survive_emptiness_filter(value in present_value_strategy()) {
            prop_assert!(!value.is_empty());
        }

        #[test]
        fn row_keys_look_like_fields(row in row_strategy(6)) {
            for key in row.keys() {
                let first = key.chars().next();
                prop_assert!(first.is_some_and(|c| c.is_ascii_lowercase()));
            }
        }
    }
}
