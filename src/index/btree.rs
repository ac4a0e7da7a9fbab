//! BTreeMap-based value index
//!
//! Maps composite keys (one `IndexKey` per indexed field) to the sorted set
//! of document ids holding that value. Iteration is key order, then
//! ascending id.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use serde_json::Value;

use crate::document::Document;

/// Serialized field value with a total ordering.
///
/// Null < Bool < Number < String. Numbers compare by exact value across
/// `Int`, `UInt` and `Float`; integral values are always stored as `Int`
/// (or `UInt` above `i64::MAX`), so numerically equal keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    /// JSON null
    Null,
    /// Boolean value (false < true)
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Integer above `i64::MAX`
    UInt(u64),
    /// Non-integral float, stored as raw bits
    Float(u64),
    /// String value
    String(String),
}

impl IndexKey {
    /// Create a key from a float
    pub fn from_float(v: f64) -> Self {
        // 2^63 and 2^64 are exact in f64; the bounds are half-open.
        if v.fract() == 0.0 && v >= -9_223_372_036_854_775_808.0 {
            if v < 9_223_372_036_854_775_808.0 {
                return IndexKey::Int(v as i64);
            }
            if v < 18_446_744_073_709_551_616.0 {
                return IndexKey::UInt(v as u64);
            }
        }
        IndexKey::Float(v.to_bits())
    }

    /// Create a key from an unsigned integer
    pub fn from_u64(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => IndexKey::Int(i),
            Err(_) => IndexKey::UInt(v),
        }
    }

    /// Create a key from a string
    pub fn from_string(v: impl Into<String>) -> Self {
        IndexKey::String(v.into())
    }

    /// Create a key from a JSON value.
    ///
    /// Arrays and objects are not indexable.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(IndexKey::Null),
            Value::Bool(b) => Some(IndexKey::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(IndexKey::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Some(IndexKey::from_u64(u))
                } else {
                    n.as_f64().map(IndexKey::from_float)
                }
            }
            Value::String(s) => Some(IndexKey::from_string(s.as_str())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            IndexKey::Null => 0,
            IndexKey::Bool(_) => 1,
            IndexKey::Int(_) | IndexKey::UInt(_) | IndexKey::Float(_) => 2,
            IndexKey::String(_) => 3,
        }
    }

    /// Exact integer value of an integral key
    fn integer(&self) -> Option<i128> {
        match self {
            IndexKey::Int(i) => Some(i128::from(*i)),
            IndexKey::UInt(u) => Some(i128::from(*u)),
            _ => None,
        }
    }
}

/// Compares an integer with a non-integral float without rounding the
/// integer.
fn cmp_int_float(int: i128, float: f64) -> Ordering {
    if float.is_nan() {
        // total_cmp puts negative NaN below every number, positive above
        return if float.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if float >= 1.0e38 {
        return Ordering::Less;
    }
    if float <= -1.0e38 {
        return Ordering::Greater;
    }

    let whole = float.trunc();
    match int.cmp(&(whole as i128)) {
        Ordering::Equal if float > whole => Ordering::Less,
        Ordering::Equal if float < whole => Ordering::Greater,
        ordering => ordering,
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        use IndexKey::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Float(a), Float(b)) => f64::from_bits(*a).total_cmp(&f64::from_bits(*b)),
            (Int(_) | UInt(_), Float(b)) => self
                .integer()
                .map_or(Ordering::Less, |a| cmp_int_float(a, f64::from_bits(*b)))
                .then(Ordering::Less),
            (Float(a), Int(_) | UInt(_)) => other
                .integer()
                .map_or(Ordering::Greater, |b| cmp_int_float(b, f64::from_bits(*a)).reverse())
                .then(Ordering::Greater),
            (Int(_) | UInt(_), Int(_) | UInt(_)) => self.integer().cmp(&other.integer()),
            (String(a), String(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One key per indexed field, compared lexicographically
pub type CompositeKey = Vec<IndexKey>;

/// Extracts the composite key of `doc` for `fields`.
///
/// Returns `None` when any field is missing or holds an array or object;
/// such documents are not indexed.
pub fn composite_key(doc: &Document, fields: &[String]) -> Option<CompositeKey> {
    fields
        .iter()
        .map(|path| doc.get(path).and_then(IndexKey::from_json))
        .collect()
}

/// A value index
#[derive(Debug, Default)]
pub struct ValueIndex {
    tree: BTreeMap<CompositeKey, BTreeSet<String>>,
}

impl ValueIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `id` to the bucket for `key`.
    pub fn insert(&mut self, key: CompositeKey, id: &str) {
        self.tree.entry(key).or_default().insert(id.to_string());
    }

    /// Removes `id` from the bucket for `key`, dropping empty buckets.
    pub fn remove(&mut self, key: &[IndexKey], id: &str) {
        if let Some(ids) = self.tree.get_mut(key) {
            ids.remove(id);
            if ids.is_empty() {
                self.tree.remove(key);
            }
        }
    }

    /// Ids whose key equals `key`, ascending.
    pub fn lookup_eq(&self, key: &[IndexKey]) -> Vec<String> {
        self.tree
            .get(key)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Ids whose key lies in `[min, max]`; either bound may be open.
    ///
    /// Results are in key order, then ascending id. An inverted range is
    /// empty.
    pub fn lookup_range(&self, min: Option<&[IndexKey]>, max: Option<&[IndexKey]>) -> Vec<String> {
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Vec::new();
            }
        }

        let lower = min.map_or(Bound::Unbounded, |k| Bound::Included(k.to_vec()));
        let upper = max.map_or(Bound::Unbounded, |k| Bound::Included(k.to_vec()));

        self.tree
            .range((lower, upper))
            .flat_map(|(_, ids)| ids.iter().cloned())
            .collect()
    }

    /// Number of distinct keys
    pub fn key_count(&self) -> usize {
        self.tree.len()
    }

    /// Number of indexed documents
    pub fn entry_count(&self) -> usize {
        self.tree.values().map(BTreeSet::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(v: Value) -> CompositeKey {
        vec![IndexKey::from_json(&v).unwrap()]
    }

    #[test]
    fn test_key_ordering() {
        let keys = [
            IndexKey::Null,
            IndexKey::Bool(false),
            IndexKey::Bool(true),
            IndexKey::Int(-100),
            IndexKey::from_float(-0.5),
            IndexKey::Int(0),
            IndexKey::from_float(1.5),
            IndexKey::Int(100),
            IndexKey::from_string("aaa"),
            IndexKey::from_string("zzz"),
        ];
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1], "{:?} < {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_large_unsigned_keys_stay_distinct() {
        let a = IndexKey::from_json(&json!(18_446_744_073_709_551_615u64)).unwrap();
        let b = IndexKey::from_json(&json!(18_446_744_073_709_551_614u64)).unwrap();
        assert_eq!(a, IndexKey::UInt(u64::MAX));
        assert_ne!(a, b);
        assert!(b < a);
        assert!(IndexKey::Int(i64::MAX) < IndexKey::UInt(i64::MAX as u64 + 1));
        assert!(IndexKey::UInt(u64::MAX) < IndexKey::from_float(1.0e20));
        assert!(IndexKey::from_float(1.5) < IndexKey::UInt(u64::MAX));
        assert_eq!(IndexKey::from_json(&json!(3u64)), Some(IndexKey::Int(3)));

        let mut index = ValueIndex::new();
        index.insert(vec![a.clone()], "max");
        index.insert(vec![b], "max-1");
        assert_eq!(index.lookup_eq(&[a]), vec!["max"]);
    }

    #[test]
    fn test_int_float_order_is_exact() {
        assert!(IndexKey::from_float(0.5) < IndexKey::Int(i64::MAX));
        assert!(IndexKey::Int(i64::MIN) < IndexKey::from_float(-0.5));
        assert!(IndexKey::Int(1) < IndexKey::from_float(1.5));
        assert!(IndexKey::from_float(1.5) < IndexKey::Int(2));
        assert!(IndexKey::from_float(-1.5) < IndexKey::Int(-1));
    }

    #[test]
    fn test_integral_float_is_int() {
        assert_eq!(IndexKey::from_json(&json!(2.0)), Some(IndexKey::Int(2)));
        assert_eq!(IndexKey::from_json(&json!([1])), None);
    }

    #[test]
    fn test_buckets_sorted_by_id() {
        let mut index = ValueIndex::new();
        index.insert(key(json!("Paris")), "h3");
        index.insert(key(json!("Paris")), "h1");
        index.insert(key(json!("Rome")), "h2");

        assert_eq!(index.lookup_eq(&key(json!("Paris"))), vec!["h1", "h3"]);
        assert_eq!(index.entry_count(), 3);
    }

    #[test]
    fn test_remove_drops_empty_bucket() {
        let mut index = ValueIndex::new();
        index.insert(key(json!(1)), "a");
        index.remove(&key(json!(1)), "a");
        assert_eq!(index.key_count(), 0);
    }

    #[test]
    fn test_range_inclusive_and_open() {
        let mut index = ValueIndex::new();
        for (i, id) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            index.insert(key(json!(i + 1)), id);
        }

        let mid = index.lookup_range(Some(&key(json!(2))), Some(&key(json!(4))));
        assert_eq!(mid, vec!["b", "c", "d"]);

        let tail = index.lookup_range(Some(&key(json!(4))), None);
        assert_eq!(tail, vec!["d", "e"]);

        let inverted = index.lookup_range(Some(&key(json!(4))), Some(&key(json!(2))));
        assert!(inverted.is_empty());
    }

    #[test]
    fn test_composite_key_requires_every_field() {
        let doc = Document::from_json("h", json!({"city": "Paris", "stars": 4})).unwrap();
        let fields = vec!["city".to_string(), "stars".to_string()];
        assert_eq!(
            composite_key(&doc, &fields),
            Some(vec![IndexKey::from_string("Paris"), IndexKey::Int(4)])
        );

        let partial = Document::from_json("h", json!({"city": "Paris"})).unwrap();
        assert_eq!(composite_key(&partial, &fields), None);
    }
}
