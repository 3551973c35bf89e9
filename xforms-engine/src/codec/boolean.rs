use super::{ValueCodec, ValueType};

/// `true`/`1` and `false`/`0`; anything else is null.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanCodec;

impl ValueCodec for BooleanCodec {
    type Runtime = Option<bool>;

    fn value_type(&self) -> ValueType {
        ValueType::Boolean
    }

    fn encode(&self, value: &Option<bool>) -> String {
        match value {
            Some(true) => "true".to_string(),
            Some(false) => "false".to_string(),
            None => String::new(),
        }
    }

    fn decode(&self, value: &str) -> Option<bool> {
        match value.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_accepts_numeric_forms() {
        assert_eq!(BooleanCodec.decode("1"), Some(true));
        assert_eq!(BooleanCodec.decode("0"), Some(false));
        assert_eq!(BooleanCodec.decode("yes"), None);
        assert_eq!(BooleanCodec.encode(&BooleanCodec.decode("1")), "true");
    }
}
