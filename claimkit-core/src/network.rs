use std::fmt;

use serde::{Deserialize, Serialize};
use strum::EnumString;

/// The DID network an account is used on (the `<network>` segment of its DID).
///
/// Well-known networks parse case-sensitively from their lowercase names;
/// anything else is kept verbatim as [`DidNetwork::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(from = "String", into = "String")]
pub enum DidNetwork {
    /// Production network.
    Main,
    /// Public test network.
    Test,
    /// Private or local development network.
    Priv,
    /// Any other network name.
    #[strum(default)]
    Custom(String),
}

impl DidNetwork {
    /// Parses a network name, returning `None` for an empty or blank name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self::from(name.to_string()))
    }

    /// The network segment as it appears in DIDs.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Main => "main",
            Self::Test => "test",
            Self::Priv => "priv",
            Self::Custom(name) => name,
        }
    }
}

impl From<String> for DidNetwork {
    fn from(name: String) -> Self {
        match name.parse::<Self>() {
            Ok(network) => network,
            Err(_) => Self::Custom(name),
        }
    }
}

impl From<DidNetwork> for String {
    fn from(network: DidNetwork) -> Self {
        match network {
            DidNetwork::Custom(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for DidNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_and_custom() {
        assert_eq!(DidNetwork::parse("main"), Some(DidNetwork::Main));
        assert_eq!(DidNetwork::parse("test"), Some(DidNetwork::Test));
        assert_eq!(
            DidNetwork::parse("staging-7"),
            Some(DidNetwork::Custom("staging-7".to_string()))
        );
        assert_eq!(DidNetwork::parse("  "), None);
    }

    #[test]
    fn test_display_round_trips() {
        for name in ["main", "test", "priv", "Main", "lab"] {
            let network = DidNetwork::parse(name).unwrap();
            assert_eq!(network.to_string(), name);
            assert_eq!(DidNetwork::from(String::from(network.clone())), network);
        }
    }

    #[test]
    fn test_serde_as_plain_string() {
        let json = serde_json::to_string(&DidNetwork::Priv).unwrap();
        assert_eq!(json, "\"priv\"");
        let decoded: DidNetwork = serde_json::from_str("\"lab\"").unwrap();
        assert_eq!(decoded, DidNetwork::Custom("lab".to_string()));
    }
}
