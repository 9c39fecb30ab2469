use std::fmt::{self, Display};

/// Payload of operations that take no discriminating parameter.
pub const DEFAULT_PAYLOAD: &str = "Default Payload";

/// The string a request's digest is computed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityPayload(String);

impl IntegrityPayload {
    pub fn default_payload() -> Self {
        Self(DEFAULT_PAYLOAD.to_string())
    }

    /// An identifier in its plain string form, e.g. `-56`.
    pub fn from_id(id: impl Display) -> Self {
        Self(id.to_string())
    }

    /// A name or filter value, taken verbatim.
    pub fn from_name(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for IntegrityPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_forms() {
        assert_eq!(IntegrityPayload::default_payload().as_str(), "Default Payload");
        assert_eq!(IntegrityPayload::from_id(-56).as_str(), "-56");
        assert_eq!(IntegrityPayload::from_name("Shoes").as_str(), "Shoes");
    }
}
