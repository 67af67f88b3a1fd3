// ── Function codec ──
//
// Devices expose state as a flat `function key → string` map. The read side
// turns that map into typed, possibly absent values; the write side turns
// `key → value` pairs into bus commands using each function's first send
// encoding.

use std::str::FromStr;

use tantron_api::{Command, FunctionDescriptor, FunctionValues};

/// Which part of a device's values to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKey<'a> {
    One(&'a str),
    All,
}

/// The read result for a [`FunctionKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionState {
    /// Device unavailable, or the key has no value.
    Absent,
    Value(String),
    All(FunctionValues),
}

impl FunctionState {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_str().and_then(parse)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_str().and_then(parse)
    }
}

/// Read `key` from `values`.
pub fn read(values: Option<&FunctionValues>, key: FunctionKey<'_>) -> FunctionState {
    let Some(values) = values else {
        return FunctionState::Absent;
    };
    match key {
        FunctionKey::All => FunctionState::All(values.clone()),
        FunctionKey::One(k) => values
            .get(k)
            .map_or(FunctionState::Absent, |v| FunctionState::Value(v.clone())),
    }
}

/// Parse a function value, returning `None` instead of failing.
pub fn parse<T: FromStr>(raw: &str) -> Option<T> {
    raw.trim().parse().ok()
}

/// Encode `values` as commands for the functions in `functions`.
///
/// Keys without a descriptor, or whose descriptor has no send encoding,
/// are dropped silently. Output order follows input order.
pub fn encode<K, V>(
    functions: &[FunctionDescriptor],
    values: impl IntoIterator<Item = (K, V)>,
) -> Vec<Command>
where
    K: AsRef<str>,
    V: Into<String>,
{
    values
        .into_iter()
        .filter_map(|(key, value)| {
            let key = key.as_ref();
            let send = functions
                .iter()
                .find(|f| f.key == key)
                .and_then(|f| f.send_list.first())?;
            Some(Command::new(key, value, send))
        })
        .collect()
}
