//! `binary` values: the instance holds a file name, the bytes live beside it.

use serde::Serialize;

use super::{ValueCodec, ValueType};

/// A file attached to an upload control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceAttachment {
    pub file_name: String,
    pub media_type: String,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl InstanceAttachment {
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// File extension including the dot, or an empty string.
    pub fn extension(&self) -> &str {
        match self.file_name.rfind('.') {
            Some(index) if index > 0 => &self.file_name[index..],
            _ => "",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

impl ValueCodec for BinaryCodec {
    type Runtime = Option<String>;

    fn value_type(&self) -> ValueType {
        ValueType::Binary
    }

    fn encode(&self, value: &Option<String>) -> String {
        value.clone().unwrap_or_default()
    }

    fn decode(&self, value: &str) -> Option<String> {
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_extension() {
        let photo = InstanceAttachment::new("photo.jpeg", "image/jpeg", vec![1, 2, 3]);
        assert_eq!(photo.extension(), ".jpeg");
        assert_eq!(photo.size(), 3);
        assert_eq!(InstanceAttachment::new(".hidden", "", []).extension(), "");
    }

    #[test]
    fn blank_binary_is_null() {
        assert_eq!(BinaryCodec.decode("  "), None);
        assert_eq!(BinaryCodec.decode("a.png"), Some("a.png".into()));
    }
}
