//! Deep semantic equality over [`Document`]s.
//!
//! Scalars compare by value (numbers by numeric value), maps by key set and
//! per-key equality, sequences by length and per-index equality. Values of
//! different kinds are never equal.

use crate::document::Document;

/// Whether two documents are semantically equal.
pub fn equal(a: &Document, b: &Document) -> bool {
    match (a, b) {
        (Document::Null, Document::Null) => true,
        (Document::Bool(x), Document::Bool(y)) => x == y,
        (Document::Number(x), Document::Number(y)) => x == y,
        (Document::String(x), Document::String(y)) => x == y,
        (Document::Sequence(xs), Document::Sequence(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| equal(x, y))
        },
        (Document::Map(xs), Document::Map(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| equal(x, y)))
        },
        (
            Document::Null
            | Document::Bool(_)
            | Document::Number(_)
            | Document::String(_)
            | Document::Sequence(_)
            | Document::Map(_),
            _,
        ) => false,
    }
}

/// Path of the first point where two documents diverge.
///
/// The root is `$`; map keys and sequence indices are joined with dots.
/// Keys are visited in canonical order, so the result is deterministic.
/// Returns `None` exactly when [`equal`] returns `true`.
pub fn first_difference(a: &Document, b: &Document) -> Option<String> {
    diverges_at(a, b, "$")
}

fn diverges_at(a: &Document, b: &Document, path: &str) -> Option<String> {
    match (a, b) {
        (Document::Sequence(xs), Document::Sequence(ys)) => {
            if xs.len() != ys.len() {
                return Some(path.to_string());
            }
            xs.iter()
                .zip(ys)
                .enumerate()
                .find_map(|(i, (x, y))| diverges_at(x, y, &format!("{}.{}", path, i)))
        },
        (Document::Map(xs), Document::Map(ys)) => {
            // A key present on only one side is reported at that key.
            let mut keys: Vec<&String> = xs.keys().chain(ys.keys()).collect();
            keys.sort();
            keys.dedup();
            keys.into_iter().find_map(|key| {
                let child = format!("{}.{}", path, key);
                match (xs.get(key), ys.get(key)) {
                    (Some(x), Some(y)) => diverges_at(x, y, &child),
                    _ => Some(child),
                }
            })
        },
        _ => {
            if equal(a, b) {
                None
            } else {
                Some(path.to_string())
            }
        },
    }
}
