//! Call Arguments Module
//!
//! The calling convention shared by every memoized function: an ordered list
//! of positional arguments and a set of named arguments.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::{MemoError, Result};
use crate::memo::finite::check_finite;

// == Call Args ==
/// Positional and named arguments of one call.
///
/// Values are held as `serde_json::Value`, so anything `Serialize` can be
/// passed. Named arguments are kept in key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CallArgs {
    positional: Vec<Value>,
    named: BTreeMap<String, Value>,
}

impl CallArgs {
    /// Creates an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds arguments from already converted values.
    pub fn from_values(positional: Vec<Value>, named: BTreeMap<String, Value>) -> Self {
        Self { positional, named }
    }

    // == Builders ==
    /// Appends a positional argument.
    ///
    /// Fails with [`MemoError::KeyDerivation`] when the value has no stable
    /// representation: a map with non-string keys, or a NaN or infinite
    /// float anywhere inside it.
    pub fn arg<T: Serialize>(mut self, value: T) -> Result<Self> {
        self.push(value)?;
        Ok(self)
    }

    /// Sets a named argument, replacing any previous value for `name`.
    pub fn named<T: Serialize>(mut self, name: impl Into<String>, value: T) -> Result<Self> {
        self.insert_named(name, value)?;
        Ok(self)
    }

    pub fn push<T: Serialize>(&mut self, value: T) -> Result<()> {
        self.positional.push(to_value(value)?);
        Ok(())
    }

    pub fn insert_named<T: Serialize>(&mut self, name: impl Into<String>, value: T) -> Result<()> {
        let name = name.into();
        let value = to_value(value)
            .map_err(|err| MemoError::KeyDerivation(format!("argument `{}`: {}", name, err)))?;
        self.named.insert(name, value);
        Ok(())
    }

    // == Accessors ==
    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn named_args(&self) -> &BTreeMap<String, Value> {
        &self.named
    }

    /// Positional argument at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    pub fn get_named(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    /// Same positional arguments with every named argument removed.
    pub fn without_named(&self) -> Self {
        Self {
            positional: self.positional.clone(),
            named: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

impl From<Vec<Value>> for CallArgs {
    fn from(positional: Vec<Value>) -> Self {
        Self::from_values(positional, BTreeMap::new())
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value> {
    check_finite(&value).map_err(|err| MemoError::KeyDerivation(err.to_string()))?;
    serde_json::to_value(value).map_err(|err| MemoError::KeyDerivation(err.to_string()))
}
