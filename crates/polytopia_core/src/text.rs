use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A length-prefixed string as the game stores it.
///
/// The game writes UTF-8 in practice but the format does not enforce it, so
/// the raw bytes are kept and written back unchanged.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct SaveString(Vec<u8>);

impl SaveString {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SaveString {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<String> for SaveString {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl PartialEq<str> for SaveString {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl PartialEq<&str> for SaveString {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl fmt::Display for SaveString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl fmt::Debug for SaveString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(text) => fmt::Debug::fmt(text, f),
            None => f.debug_tuple("SaveString").field(&self.0).finish(),
        }
    }
}

// Valid UTF-8 serializes as a plain string; anything else as its bytes.
impl Serialize for SaveString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_str() {
            Some(text) => serializer.serialize_str(text),
            None => serializer.serialize_bytes(&self.0),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SaveStringRepr {
    Text(String),
    Bytes(Vec<u8>),
}

impl<'de> Deserialize<'de> for SaveString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match SaveStringRepr::deserialize(deserializer)? {
            SaveStringRepr::Text(text) => text.into(),
            SaveStringRepr::Bytes(bytes) => Self(bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::SaveString;

    #[test]
    fn compares_and_displays_as_text() {
        let name = SaveString::from("Kiera");
        assert_eq!(name, "Kiera");
        assert_eq!(name.as_str(), Some("Kiera"));
        assert_eq!(name.to_string(), "Kiera");
        assert_eq!(format!("{name:?}"), "\"Kiera\"");
    }

    #[test]
    fn invalid_utf8_keeps_its_bytes() {
        let name = SaveString::from_bytes(vec![b'A', 0xff, b'B']);
        assert_eq!(name.as_str(), None);
        assert_eq!(name.as_bytes(), &[b'A', 0xff, b'B']);
        assert_eq!(name.to_string(), "A\u{fffd}B");
    }

    #[test]
    fn json_round_trip_preserves_raw_bytes() {
        let text = SaveString::from("Beta");
        let json = serde_json::to_string(&text).expect("serialize text");
        assert_eq!(json, "\"Beta\"");
        let back: SaveString = serde_json::from_str(&json).expect("deserialize text");
        assert_eq!(back, text);

        let raw = SaveString::from_bytes(vec![0xc3, 0x28]);
        let json = serde_json::to_string(&raw).expect("serialize bytes");
        assert_eq!(json, "[195,40]");
        let back: SaveString = serde_json::from_str(&json).expect("deserialize bytes");
        assert_eq!(back, raw);
    }
}
