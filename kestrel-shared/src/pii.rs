use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps passenger-identifying data so it never reaches log output.
/// Serialization still writes the real value.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn inner(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl From<String> for Masked<String> {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Masked<String> {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_hides_value_in_debug() {
        let name = Masked::from("Alice");
        assert_eq!(format!("{:?}", name), "********");
        assert_eq!(format!("{}", name), "********");
    }

    #[test]
    fn test_masked_serializes_real_value() {
        let name = Masked::from("Alice");
        assert_eq!(serde_json::to_string(&name).unwrap(), r#""Alice""#);
        let back: Masked<String> = serde_json::from_str(r#""Bob""#).unwrap();
        assert_eq!(back.into_inner(), "Bob");
    }
}
