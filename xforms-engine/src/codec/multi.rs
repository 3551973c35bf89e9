//! Multi-value codecs for select and rank controls.
//!
//! Values are whitespace-separated tokens in the instance string.

use indexmap::IndexSet;

use super::{StringCodec, ValueCodec, ValueType};

pub(crate) fn is_token(value: &str) -> bool {
    !value.is_empty() && !value.chars().any(char::is_whitespace)
}

fn split(value: &str) -> impl Iterator<Item = String> + '_ {
    value.split_whitespace().map(|token| StringCodec.decode(token))
}

/// Unique values; the first occurrence of a duplicate wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetCodec;

impl ValueCodec for SetCodec {
    type Runtime = Vec<String>;

    fn value_type(&self) -> ValueType {
        ValueType::String
    }

    fn encode(&self, values: &Vec<String>) -> String {
        let unique: IndexSet<&str> = values.iter().map(String::as_str).collect();
        unique.into_iter().collect::<Vec<_>>().join(" ")
    }

    fn decode(&self, value: &str) -> Vec<String> {
        split(value).collect::<IndexSet<_>>().into_iter().collect()
    }
}

/// Ordered values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayCodec;

impl ValueCodec for ArrayCodec {
    type Runtime = Vec<String>;

    fn value_type(&self) -> ValueType {
        ValueType::String
    }

    fn encode(&self, values: &Vec<String>) -> String {
        values
            .iter()
            .map(|value| StringCodec.encode(value))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn decode(&self, value: &str) -> Vec<String> {
        split(value).collect()
    }
}
