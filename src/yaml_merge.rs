// SPDX-License-Identifier: Apache-2.0

use serde_yaml::Value;

/// Deep-merges `from` into `to`, preserving keys of `to` that `from` does
/// not mention.
///
/// Rules: maps merge key-wise (recursing on shared keys); a scalar in
/// `from` wins over whatever was in `to`; a `null` in `from` preserves the
/// existing value in `to` rather than erasing it. Used by the bus CSV
/// importer, the module catalog's Verilog importer, and reset-spec
/// loading, so library files round-trip unknown hand-edited keys instead
/// of being replaced wholesale.
pub fn merge_preserving_unknown_keys(to: &Value, from: &Value) -> Value {
    match (to, from) {
        (_, Value::Null) => to.clone(),
        (Value::Mapping(to_map), Value::Mapping(from_map)) => {
            if from_map.is_empty() {
                return to.clone();
            }
            let mut result = serde_yaml::Mapping::new();
            for (key, to_value) in to_map {
                if let Some(from_value) = from_map.get(key) {
                    result.insert(key.clone(), merge_preserving_unknown_keys(to_value, from_value));
                } else {
                    result.insert(key.clone(), to_value.clone());
                }
            }
            for (key, from_value) in from_map {
                if !result.contains_key(key) {
                    result.insert(key.clone(), from_value.clone());
                }
            }
            Value::Mapping(result)
        }
        (_, other) => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(src: &str) -> Value {
        serde_yaml::from_str(src).unwrap()
    }

    #[test]
    fn scalars_prefer_new_value() {
        let to = yaml("width: 8");
        let from = yaml("width: 32");
        let merged = merge_preserving_unknown_keys(&to, &from);
        assert_eq!(merged, yaml("width: 32"));
    }

    #[test]
    fn null_preserves_old_value() {
        let to = yaml("width: 8");
        let from = yaml("width: null");
        let merged = merge_preserving_unknown_keys(&to, &from);
        assert_eq!(merged, yaml("width: 8"));
    }

    #[test]
    fn maps_merge_key_wise_and_keep_unknown_keys() {
        let to = yaml("a: 1\nb: 2\n");
        let from = yaml("b: 20\nc: 30\n");
        let merged = merge_preserving_unknown_keys(&to, &from);
        assert_eq!(merged, yaml("a: 1\nb: 20\nc: 30\n"));
    }

    #[test]
    fn nested_maps_recurse() {
        let to = yaml("apb:\n  pclk: {direction: in, width: 1}\n");
        let from = yaml("apb:\n  pclk: {width: 1}\n  prdata: {direction: out, width: 32}\n");
        let merged = merge_preserving_unknown_keys(&to, &from);
        assert_eq!(
            merged,
            yaml("apb:\n  pclk: {direction: in, width: 1}\n  prdata: {direction: out, width: 32}\n")
        );
    }
}
