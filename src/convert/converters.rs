//! Converter Module
//!
//! Key and value converter contracts plus the stock implementations.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

// == Key Converter ==
/// Maps typed keys onto the engine's string keys and back.
///
/// `from_raw` may return None for raw keys that do not represent a valid
/// typed key; such keys are filtered out of typed iteration.
pub trait KeyConverter {
    type Key;

    fn to_raw(&self, key: &Self::Key) -> String;
    fn from_raw(&self, raw: &str) -> Option<Self::Key>;
}

// == Value Converter ==
/// Maps typed values onto payload bytes and back. Conversion may fail, e.g.
/// for malformed stored bytes.
pub trait ValueConverter {
    type Value;

    fn to_bytes(&self, value: &Self::Value) -> Result<Vec<u8>>;
    fn from_bytes(&self, raw: &[u8]) -> Result<Self::Value>;
}

// == Passthrough Key Converter ==
/// String keys used as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughKeyConverter;

impl KeyConverter for PassthroughKeyConverter {
    type Key = String;

    fn to_raw(&self, key: &String) -> String {
        key.clone()
    }

    fn from_raw(&self, raw: &str) -> Option<String> {
        Some(raw.to_string())
    }
}

// == Index Key Converter ==
/// Integer keys rendered in a configurable radix (2 to 36).
#[derive(Debug, Clone, Copy)]
pub struct IndexKeyConverter {
    radix: u32,
}

impl IndexKeyConverter {
    pub fn new(radix: u32) -> Self {
        assert!((2..=36).contains(&radix), "radix must be in 2..=36");
        Self { radix }
    }
}

impl Default for IndexKeyConverter {
    fn default() -> Self {
        Self::new(10)
    }
}

impl KeyConverter for IndexKeyConverter {
    type Key = u64;

    fn to_raw(&self, key: &u64) -> String {
        let mut value = *key;
        let mut digits = Vec::new();
        loop {
            let digit = (value % u64::from(self.radix)) as u32;
            digits.push(char::from_digit(digit, self.radix).expect("digit within radix"));
            value /= u64::from(self.radix);
            if value == 0 {
                break;
            }
        }
        digits.iter().rev().collect()
    }

    fn from_raw(&self, raw: &str) -> Option<u64> {
        u64::from_str_radix(raw, self.radix).ok()
    }
}

// == Passthrough Value Converter ==
/// Raw bytes used as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughValueConverter;

impl ValueConverter for PassthroughValueConverter {
    type Value = Vec<u8>;

    fn to_bytes(&self, value: &Vec<u8>) -> Result<Vec<u8>> {
        Ok(value.clone())
    }

    fn from_bytes(&self, raw: &[u8]) -> Result<Vec<u8>> {
        Ok(raw.to_vec())
    }
}

// == JSON Value Converter ==
/// Values serialized as UTF-8 JSON.
#[derive(Debug, Clone, Copy)]
pub struct JsonValueConverter<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonValueConverter<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonValueConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ValueConverter for JsonValueConverter<T>
where
    T: Serialize + DeserializeOwned,
{
    type Value = T;

    fn to_bytes(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn from_bytes(&self, raw: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(raw)?)
    }
}
