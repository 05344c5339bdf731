use indexmap::map::Entry;

use crate::value::{Mapping, Value};

/// Deep-merge `overlay` on top of `base`.
/// If both sides have a mapping for the same key, recurse.
/// Otherwise, `overlay`'s value wins; sequences are replaced, never concatenated.
/// Keys keep the position they first appeared at.
pub fn deep_merge(mut base: Mapping, overlay: Mapping) -> Mapping {
    for (key, overlay_val) in overlay {
        match base.entry(key) {
            Entry::Occupied(mut slot) => match (slot.get_mut(), overlay_val) {
                (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
                    let merged = deep_merge(std::mem::take(base_map), overlay_map);
                    *base_map = merged;
                }
                (existing, overlay_val) => *existing = overlay_val,
            },
            Entry::Vacant(slot) => {
                slot.insert(overlay_val);
            }
        }
    }
    base
}

/// Merge mappings ranked low to high; later mappings are authoritative.
pub fn merge_all(mappings: impl IntoIterator<Item = Mapping>) -> Mapping {
    mappings.into_iter().fold(Mapping::new(), deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(toml_str: &str) -> Mapping {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn disjoint_keys_merge() {
        let base = mapping(r#"host = "localhost""#);
        let overlay = mapping("port = 3000");
        let merged = deep_merge(base, overlay);
        assert_eq!(merged["host"].as_str().unwrap(), "localhost");
        assert_eq!(merged["port"].as_integer().unwrap(), 3000);
    }

    #[test]
    fn same_scalar_key_overlay_wins() {
        let base = mapping("port = 8080");
        let overlay = mapping("port = 3000");
        let merged = deep_merge(base, overlay);
        assert_eq!(merged["port"].as_integer().unwrap(), 3000);
    }

    #[test]
    fn nested_mappings_recurse() {
        let base = mapping(
            r#"
            [database]
            url = "postgres://old"
            pool_size = 5
            "#,
        );
        let overlay = mapping(
            r#"
            [database]
            pool_size = 20
            "#,
        );
        let merged = deep_merge(base, overlay);
        let db = merged["database"].as_mapping().unwrap();
        assert_eq!(db["url"].as_str().unwrap(), "postgres://old");
        assert_eq!(db["pool_size"].as_integer().unwrap(), 20);
    }

    #[test]
    fn overlay_scalar_replaces_mapping() {
        let base = mapping("[database]\nurl = \"x\"\n");
        let overlay = mapping(r#"database = "flat_string""#);
        let merged = deep_merge(base, overlay);
        assert_eq!(merged["database"].as_str().unwrap(), "flat_string");
    }

    #[test]
    fn overlay_mapping_replaces_scalar() {
        let base = mapping(r#"database = "flat_string""#);
        let overlay = mapping("[database]\nurl = \"x\"\n");
        let merged = deep_merge(base, overlay);
        assert_eq!(merged["database"], overlay_value("[database]\nurl = \"x\"\n", "database"));
    }

    fn overlay_value(toml_str: &str, key: &str) -> Value {
        mapping(toml_str)[key].clone()
    }

    #[test]
    fn sequences_are_replaced_not_concatenated() {
        let base = mapping("tags = [\"a\", \"b\"]");
        let overlay = mapping("tags = [\"c\"]");
        let merged = deep_merge(base, overlay);
        assert_eq!(merged["tags"], Value::Sequence(vec![Value::from("c")]));
    }

    #[test]
    fn empty_overlay_returns_base() {
        let base = mapping("port = 8080");
        let merged = deep_merge(base.clone(), Mapping::new());
        assert_eq!(merged, base);
    }

    #[test]
    fn empty_base_returns_overlay() {
        let overlay = mapping("port = 3000");
        let merged = deep_merge(Mapping::new(), overlay.clone());
        assert_eq!(merged, overlay);
    }

    #[test]
    fn deeply_nested_three_levels() {
        let base = mapping("[a.b.c]\nval = 1\nother = \"keep\"\n");
        let overlay = mapping("[a.b.c]\nval = 99\n");
        let merged = deep_merge(base, overlay);
        let c = merged["a"].as_mapping().unwrap()["b"].as_mapping().unwrap()["c"]
            .as_mapping()
            .unwrap();
        assert_eq!(c["val"].as_integer().unwrap(), 99);
        assert_eq!(c["other"].as_str().unwrap(), "keep");
    }

    #[test]
    fn key_order_follows_first_appearance() {
        let base = mapping("b = 1\na = 2");
        let overlay = mapping("c = 3\nb = 4");
        let merged = deep_merge(base, overlay);
        let keys: Vec<&str> = merged.keys().map(String::as_str).collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn nested_key_merges_like_its_parts() {
        let m1 = mapping("[db]\nhost = \"a\"\nport = 1\n");
        let m2 = mapping("[db]\nport = 2\nuser = \"u\"\n");
        let whole = merge_all([m1.clone(), m2.clone()]);
        let parts = deep_merge(
            m1["db"].as_mapping().unwrap().clone(),
            m2["db"].as_mapping().unwrap().clone(),
        );
        assert_eq!(whole["db"], Value::Mapping(parts));
    }

    #[test]
    fn merge_is_associative() {
        let a = mapping("host = \"a\"\n[db]\nport = 1\nuser = \"a\"\n");
        let b = mapping("tags = [1]\n[db]\nport = 2\n");
        let c = mapping("host = \"c\"\n[db]\nuser = \"c\"\n");
        let flat = merge_all([a.clone(), b.clone(), c.clone()]);
        let grouped = merge_all([merge_all([a, b]), c]);
        assert_eq!(flat, grouped);
        assert_eq!(flat["host"].as_str().unwrap(), "c");
        let db = flat["db"].as_mapping().unwrap();
        assert_eq!(db["port"].as_integer().unwrap(), 2);
        assert_eq!(db["user"].as_str().unwrap(), "c");
    }

    #[test]
    fn multiple_sequential_merges() {
        let a = mapping(r#"host = "a""#);
        let b = mapping("port = 1000");
        let c = mapping(r#"host = "c""#);
        let merged = merge_all([a, b, c]);
        assert_eq!(merged["host"].as_str().unwrap(), "c");
        assert_eq!(merged["port"].as_integer().unwrap(), 1000);
    }
}
