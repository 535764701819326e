//! Key Derivation Module
//!
//! Maps a call's arguments to a [`CacheKey`]. The default [`TypedRepr`]
//! scheme prints each argument followed by its type tag:
//!
//! ```text
//! f(1, "1", x=2.5)  ->  "1<int> 1<str>2.5<float>"
//! ```
//!
//! Positional representations are joined by single spaces, named ones the
//! same way (in name order), and the two halves are concatenated directly.
//! Only named argument *values* take part, so `f(a=1)` and `f(b=1)` share a
//! key. Use [`Structural`] or a custom [`KeyDeriver`] when that matters.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheKey;
use crate::error::{MemoError, Result};
use crate::memo::CallArgs;

// == Key Deriver Trait ==
/// Strategy turning call arguments into a cache key.
///
/// Equal arguments must always produce equal keys. Any
/// `Fn(&CallArgs) -> Result<CacheKey>` closure is a deriver.
pub trait KeyDeriver: Send + Sync {
    fn derive(&self, args: &CallArgs) -> Result<CacheKey>;
}

impl<F> KeyDeriver for F
where
    F: Fn(&CallArgs) -> Result<CacheKey> + Send + Sync,
{
    fn derive(&self, args: &CallArgs) -> Result<CacheKey> {
        self(args)
    }
}

// == Typed Repr ==
/// Printed value plus type tag. Reproducible but not collision free: a
/// string that itself contains `<int> ` can print like two arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypedRepr;

impl KeyDeriver for TypedRepr {
    fn derive(&self, args: &CallArgs) -> Result<CacheKey> {
        let positional = join_typed(args.positional().iter());
        let named = join_typed(args.named_args().values());
        Ok(CacheKey::new(positional + &named))
    }
}

fn join_typed<'a>(values: impl Iterator<Item = &'a Value>) -> String {
    values
        .map(|value| format!("{}<{}>", printed(value), type_tag(value)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Printed form of a value: strings raw, everything else as compact JSON.
pub fn printed(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Runtime type tag of an argument value.
pub fn type_tag(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

// == Structural ==
/// Canonical JSON of the whole argument set, names included.
///
/// JSON quoting keeps strings, numbers and nesting apart, and maps are
/// serialized in key order, so distinct arguments never share a key.
/// Floats without a JSON form (NaN, infinities) never get this far:
/// [`CallArgs`] refuses them when they are added.
#[derive(Debug, Clone, Copy, Default)]
pub struct Structural;

#[derive(Serialize)]
struct Canonical<'a> {
    #[serde(rename = "a")]
    positional: &'a [Value],
    #[serde(rename = "k")]
    named: &'a std::collections::BTreeMap<String, Value>,
}

impl KeyDeriver for Structural {
    fn derive(&self, args: &CallArgs) -> Result<CacheKey> {
        let canonical = Canonical {
            positional: args.positional(),
            named: args.named_args(),
        };
        serde_json::to_string(&canonical)
            .map(CacheKey::new)
            .map_err(|err| MemoError::KeyDerivation(err.to_string()))
    }
}
