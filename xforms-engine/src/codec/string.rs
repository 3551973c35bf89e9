use super::{ValueCodec, ValueType};

/// Identity codec for `string` and `barcode` values.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl ValueCodec for StringCodec {
    type Runtime = String;

    fn value_type(&self) -> ValueType {
        ValueType::String
    }

    fn encode(&self, value: &String) -> String {
        value.clone()
    }

    fn decode(&self, value: &str) -> String {
        value.to_string()
    }
}
