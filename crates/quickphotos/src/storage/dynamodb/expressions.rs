//! DynamoDB expression builders.
//!
//! Pure functions producing key-condition, condition and update expressions
//! together with their placeholder maps. Testable without DynamoDB access.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use quickphotos_core::storage::{IndexTarget, KeyCondition};

use crate::storage::store::CounterPath;

/// Guard for inserts: no row may exist at the item's key.
pub const ATTRIBUTE_NOT_EXISTS: &str = "attribute_not_exists(SK)";
/// Guard for increments: the target row must already exist.
pub const ATTRIBUTE_EXISTS: &str = "attribute_exists(PK)";

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
}

/// Builds `hash = :hash [AND range BETWEEN :lower AND :upper]`.
///
/// The upper sentinel is never a stored key, so the inclusive `BETWEEN`
/// behaves as the half-open range it describes.
pub fn key_condition(index: IndexTarget, condition: &KeyCondition) -> Expression {
    let mut names = HashMap::new();
    let mut values = HashMap::new();

    names.insert("#hash".to_string(), index.hash_attribute().to_string());
    values.insert(
        ":hash".to_string(),
        AttributeValue::S(condition.partition.clone()),
    );

    let expression = match &condition.range {
        None => "#hash = :hash".to_string(),
        Some(range) => {
            names.insert("#range".to_string(), index.range_attribute().to_string());
            values.insert(":lower".to_string(), AttributeValue::S(range.lower.clone()));
            values.insert(
                ":upper".to_string(),
                AttributeValue::S(range.upper_exclusive_sentinel.clone()),
            );
            "#hash = :hash AND #range BETWEEN :lower AND :upper".to_string()
        }
    };

    Expression {
        expression,
        names,
        values,
    }
}

/// Builds `SET path = if_not_exists(path, :zero) + :inc` for a counter.
///
/// An absent counter starts from zero. A map entry can only be created under
/// an existing map, so rows carrying reaction counters must have the
/// `reactions` map. Map entries go through name placeholders, since keys
/// such as `+1` are not valid bare document paths.
pub fn increment(counter: &CounterPath, by: i64) -> Expression {
    let mut names = HashMap::new();
    let mut values = HashMap::new();
    values.insert(":inc".to_string(), AttributeValue::N(by.to_string()));
    values.insert(":zero".to_string(), AttributeValue::N("0".to_string()));

    let path = match counter {
        CounterPath::Attribute(name) => {
            names.insert("#counter".to_string(), name.to_string());
            "#counter"
        }
        CounterPath::MapEntry { map, entry } => {
            names.insert("#map".to_string(), map.to_string());
            names.insert("#entry".to_string(), entry.clone());
            "#map.#entry"
        }
    };

    Expression {
        expression: format!("SET {path} = if_not_exists({path}, :zero) + :inc"),
        names,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickphotos_core::storage::KeyRange;

    #[test]
    fn test_exact_match_on_inverted_index() {
        let expr = key_condition(
            IndexTarget::InvertedIndex,
            &KeyCondition {
                partition: "#FRIEND#haroldwatkins".to_string(),
                range: None,
            },
        );

        assert_eq!(expr.expression, "#hash = :hash");
        assert_eq!(expr.names.get("#hash").unwrap(), "SK");
        assert_eq!(
            expr.values.get(":hash").unwrap().as_s().unwrap(),
            "#FRIEND#haroldwatkins"
        );
        assert!(!expr.names.contains_key("#range"));
    }

    #[test]
    fn test_range_on_base_table() {
        let expr = key_condition(
            IndexTarget::Table,
            &KeyCondition {
                partition: "USER#jacksonjason".to_string(),
                range: Some(KeyRange::new("#METADATA#jacksonjason", "PHOTO$")),
            },
        );

        assert_eq!(
            expr.expression,
            "#hash = :hash AND #range BETWEEN :lower AND :upper"
        );
        assert_eq!(expr.names.get("#hash").unwrap(), "PK");
        assert_eq!(expr.names.get("#range").unwrap(), "SK");
        assert_eq!(
            expr.values.get(":upper").unwrap().as_s().unwrap(),
            "PHOTO$"
        );
    }

    #[test]
    fn test_range_on_inverted_index_swaps_attributes() {
        let expr = key_condition(
            IndexTarget::InvertedIndex,
            &KeyCondition {
                partition: "PHOTO#ppierce#2019-04-14T08:09:34".to_string(),
                range: Some(KeyRange::new("REACTION#", "USER$")),
            },
        );

        assert_eq!(expr.names.get("#hash").unwrap(), "SK");
        assert_eq!(expr.names.get("#range").unwrap(), "PK");
        assert_eq!(
            expr.values.get(":lower").unwrap().as_s().unwrap(),
            "REACTION#"
        );
    }

    #[test]
    fn test_increment_attribute() {
        let expr = increment(&CounterPath::Attribute("followers"), 1);

        assert_eq!(
            expr.expression,
            "SET #counter = if_not_exists(#counter, :zero) + :inc"
        );
        assert_eq!(expr.names.get("#counter").unwrap(), "followers");
        assert_eq!(expr.values.get(":inc").unwrap().as_n().unwrap(), "1");
        assert_eq!(expr.values.get(":zero").unwrap().as_n().unwrap(), "0");
    }

    #[test]
    fn test_increment_map_entry_uses_placeholders() {
        let expr = increment(
            &CounterPath::MapEntry {
                map: "reactions",
                entry: "+1".to_string(),
            },
            1,
        );

        assert_eq!(
            expr.expression,
            "SET #map.#entry = if_not_exists(#map.#entry, :zero) + :inc"
        );
        assert_eq!(expr.names.get("#map").unwrap(), "reactions");
        assert_eq!(expr.names.get("#entry").unwrap(), "+1");
        assert!(!expr.expression.contains("+1"));
    }
}
