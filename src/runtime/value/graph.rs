//! Walks over compound value graphs
//!
//! Containers share their elements, so a value is a DAG whose expanded size
//! can double with every level of nesting. Insertion refuses any edge that
//! would close a cycle, and every walk here runs on an explicit worklist with
//! a visit bound, so neither deep nor wide graphs can exhaust the native
//! stack.

use super::{Value, ValueError};
use crate::parser::limits::MAX_GRAPH_NODES;
use std::collections::HashSet;
use std::fmt;

/// Deepest nesting rendered by `Display` before eliding with `..`
const DISPLAY_DEPTH: usize = 8;

/// Most elements rendered by one `Display` call
const DISPLAY_ITEMS: usize = 64;

fn too_many_nodes() -> ValueError {
    ValueError::TooManyContainers { limit: MAX_GRAPH_NODES }
}

/// Elements that may hold containers: sequence items, or map values
fn nested(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(a) => a.items(),
        Value::Struct(s) => s.items(),
        Value::Map(m) => m.values(),
        _ => Vec::new(),
    }
}

/// Whether the storage at `target` is `value` itself or reachable from it
pub(crate) fn reaches(value: &Value, target: *const ()) -> Result<bool, ValueError> {
    let mut visited = HashSet::new();
    let mut pending = vec![value.clone()];
    while let Some(current) = pending.pop() {
        let Some(ptr) = current.storage_ptr() else {
            continue;
        };
        if ptr == target {
            return Ok(true);
        }
        if !visited.insert(ptr) {
            continue;
        }
        if visited.len() > MAX_GRAPH_NODES {
            return Err(too_many_nodes());
        }
        pending.extend(nested(&current).into_iter().filter(Value::is_compound));
    }
    Ok(false)
}

/// Canonical memory of `value`, failing as soon as it grows past `limit`
/// bytes
pub(crate) fn flatten(value: &Value, limit: usize) -> Result<Vec<u8>, ValueError> {
    let mut out = Vec::new();
    let mut visits = 0usize;
    let mut pending = vec![value.clone()];
    while let Some(current) = pending.pop() {
        match &current {
            Value::Null => {}
            Value::Boolean(b) => out.push(u8::from(*b)),
            Value::Integer(i) => out.extend_from_slice(&i.to_bytes()),
            Value::ByteString(b) => out.extend_from_slice(b.as_bytes()),
            Value::Array(_) | Value::Struct(_) => {
                visits += 1;
                if visits > MAX_GRAPH_NODES {
                    return Err(too_many_nodes());
                }
                pending.extend(nested(&current).into_iter().rev());
            }
            Value::Map(m) => {
                visits += 1;
                if visits > MAX_GRAPH_NODES {
                    return Err(too_many_nodes());
                }
                // keys first, then values
                pending.extend(m.values().into_iter().rev());
                pending.extend(m.keys().into_iter().rev());
            }
        }
        if out.len() > limit {
            return Err(ValueError::MemoryTooLarge { limit });
        }
    }
    Ok(out)
}

/// Structural equality.
///
/// A pair of containers already under comparison is assumed equal, which
/// keeps shared subgraphs from being compared more than once.
pub(crate) fn equals(a: &Value, b: &Value) -> bool {
    let mut assumed = HashSet::new();
    let mut pending = vec![(a.clone(), b.clone())];
    while let Some((x, y)) = pending.pop() {
        let same = match (&x, &y) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(p), Value::Boolean(q)) => p == q,
            (Value::Integer(p), Value::Integer(q)) => p == q,
            (Value::ByteString(p), Value::ByteString(q)) => p == q,
            (Value::Array(_), Value::Array(_)) | (Value::Struct(_), Value::Struct(_)) => {
                if x.same_storage(&y) || !assumed.insert((x.storage_ptr(), y.storage_ptr())) {
                    continue;
                }
                let (left, right) = (nested(&x), nested(&y));
                let same_len = left.len() == right.len();
                pending.extend(left.into_iter().zip(right));
                same_len
            }
            (Value::Map(p), Value::Map(q)) => {
                if p.ptr_eq(q) || !assumed.insert((x.storage_ptr(), y.storage_ptr())) {
                    continue;
                }
                if p.count() != q.count() {
                    return false;
                }
                for (key, value) in p.entries() {
                    match q.try_get(&key) {
                        Ok(Some(other)) => pending.push((value, other)),
                        _ => return false,
                    }
                }
                true
            }
            _ => false,
        };
        if !same {
            return false;
        }
    }
    true
}

/// Render `value`, eliding containers nested deeper than [`DISPLAY_DEPTH`]
/// and elements past the first [`DISPLAY_ITEMS`]
pub(crate) fn display(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut budget = DISPLAY_ITEMS;
    write_value(f, value, 0, &mut budget)
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &Value, depth: usize, budget: &mut usize) -> fmt::Result {
    let (open, close) = match value {
        Value::Null => return write!(f, "null"),
        Value::Boolean(b) => return write!(f, "{b}"),
        Value::Integer(i) => return write!(f, "{}", i.value()),
        Value::ByteString(b) => return write!(f, "0x{}", hex::encode(b.as_bytes())),
        Value::Array(_) => ("[", "]"),
        Value::Struct(_) => ("struct(", ")"),
        Value::Map(_) => ("{", "}"),
    };
    if depth >= DISPLAY_DEPTH {
        return write!(f, "{open}..{close}");
    }
    write!(f, "{open}")?;
    let entries: Vec<(Option<Value>, Value)> = match value {
        Value::Map(m) => m.entries().into_iter().map(|(k, v)| (Some(k), v)).collect(),
        other => nested(other).into_iter().map(|v| (None, v)).collect(),
    };
    for (i, (key, item)) in entries.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        if *budget == 0 {
            write!(f, "..")?;
            break;
        }
        *budget -= 1;
        if let Some(key) = key {
            write_value(f, key, depth + 1, budget)?;
            write!(f, ": ")?;
        }
        write_value(f, item, depth + 1, budget)?;
    }
    write!(f, "{close}")
}

/// Drop `items`, unpacking containers whose last handle is going away
/// instead of letting their destructors recurse
pub(crate) fn release(items: Vec<Value>) {
    let mut pending = items;
    while let Some(value) = pending.pop() {
        let inner = match value {
            Value::Array(a) => a.into_unique_items(),
            Value::Struct(s) => s.into_unique_items(),
            Value::Map(m) => m.into_unique_values(),
            _ => None,
        };
        if let Some(inner) = inner {
            pending.extend(inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::{Array, Map, StackItemType, Struct};

    /// Each level holds the previous level twice
    fn doubling(levels: usize) -> Value {
        let mut value = Value::from_array(Array::new(vec![Value::from_int(1)]));
        for _ in 0..levels {
            value = Value::from_array(Array::new(vec![value.clone(), value]));
        }
        value
    }

    /// Each level holds only the previous one
    fn chain(levels: usize) -> Value {
        let mut value = Value::from_array(Array::new(Vec::new()));
        for _ in 0..levels {
            value = Value::from_array(Array::new(vec![value]));
        }
        value
    }

    #[test]
    fn indirect_cycles_are_rejected() {
        let a = Array::new(Vec::new());
        let b = Array::new(Vec::new());
        a.add(Value::from_array(b.clone())).unwrap();
        assert_eq!(
            b.add(Value::from_array(a.clone())),
            Err(ValueError::SelfReference(StackItemType::Array))
        );

        let map = Map::new();
        let holder = Struct::new(vec![Value::from_map(map.clone())]);
        assert_eq!(
            map.set(Value::from_int(1), Value::from_struct(holder)),
            Err(ValueError::SelfReference(StackItemType::Map))
        );
        assert!(b.is_empty());
        assert!(map.is_empty());
    }

    #[test]
    fn shared_elements_are_not_cycles() {
        let leaf = Value::from_array(Array::new(Vec::new()));
        let parent = Array::new(vec![leaf.clone()]);
        parent.add(leaf).unwrap();
        assert_eq!(parent.count(), 2);
    }

    #[test]
    fn flatten_stops_at_the_byte_limit() {
        let value = doubling(40);
        assert_eq!(flatten(&value, 1024), Err(ValueError::MemoryTooLarge { limit: 1024 }));
        assert_eq!(flatten(&doubling(3), 1024).unwrap(), vec![1u8; 8]);
    }

    #[test]
    fn flatten_bounds_visits_of_empty_containers() {
        let mut value = Value::from_array(Array::new(Vec::new()));
        for _ in 0..40 {
            value = Value::from_array(Array::new(vec![value.clone(), value]));
        }
        assert_eq!(flatten(&value, usize::MAX), Err(too_many_nodes()));
    }

    #[test]
    fn equality_of_shared_graphs_is_exact() {
        assert!(equals(&doubling(40), &doubling(40)));
        assert!(!equals(&doubling(40), &doubling(39)));

        let a = doubling(4);
        let b = doubling(4);
        b.as_array().unwrap().add(Value::Null).unwrap();
        assert!(!equals(&a, &b));
    }

    #[test]
    fn display_elides_deep_and_wide_values() {
        assert_eq!(chain(2).to_string(), "[[[]]]");
        let deep = chain(100_000).to_string();
        assert!(deep.starts_with("[[[[[[[[[..]"));
        let wide = Value::from_array(Array::new((0..100).map(Value::from_int).collect())).to_string();
        assert!(wide.ends_with("62, 63, ..]"));
    }

    #[test]
    fn deep_chains_drop_without_recursing() {
        let value = chain(1_000_000);
        drop(value);
    }
}
