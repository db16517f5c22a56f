//! Network identifier that covers both named and arbitrary ids.

use core::{fmt, str::FromStr};

use crate::NamedNetwork;

/// The network the client resolves its contract deployment on.
pub const TARGET_NETWORK: Network = Network::Named(NamedNetwork::Ganache);

/// A network identifier.
///
/// Descriptor files key deployments by the decimal network id, so any id can
/// be addressed, not only the well-known ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Network {
    /// A well-known network.
    Named(NamedNetwork),
    /// Any other network, by id.
    Id(u64),
}

impl Network {
    /// Creates a network from its numeric id, preferring the named form.
    pub fn from_id(id: u64) -> Self {
        NamedNetwork::try_from(id).map_or(Self::Id(id), Self::Named)
    }

    /// Returns the numeric network id.
    pub const fn id(&self) -> u64 {
        match self {
            Self::Named(named) => named.id(),
            Self::Id(id) => *id,
        }
    }

    /// Returns the named network, if this id is a well-known one.
    pub const fn named(&self) -> Option<NamedNetwork> {
        match self {
            Self::Named(named) => Some(*named),
            Self::Id(_) => None,
        }
    }

    /// Returns the key under which descriptor files list this network.
    pub fn deployment_key(&self) -> String {
        self.id().to_string()
    }
}

impl Default for Network {
    fn default() -> Self {
        TARGET_NETWORK
    }
}

impl From<NamedNetwork> for Network {
    fn from(named: NamedNetwork) -> Self {
        Self::Named(named)
    }
}

impl From<u64> for Network {
    fn from(id: u64) -> Self {
        Self::from_id(id)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(named) => write!(f, "{named} ({})", named.id()),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

/// Error returned when a network string is neither a known name nor an id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseNetworkError(String);

impl fmt::Display for ParseNetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown network `{}`", self.0)
    }
}

impl std::error::Error for ParseNetworkError {}

impl FromStr for Network {
    type Err = ParseNetworkError;

    /// Parses a decimal network id (`"5777"`) or a network name (`"ganache"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<u64>() {
            return Ok(Self::from_id(id));
        }
        s.parse::<NamedNetwork>()
            .map(Self::Named)
            .map_err(|_| ParseNetworkError(s.to_owned()))
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Network {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Id(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Id(id) => Ok(Self::from_id(id)),
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Network {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_target_network() {
        assert_eq!(TARGET_NETWORK.id(), 5777);
        assert_eq!(TARGET_NETWORK.deployment_key(), "5777");
        assert_eq!(Network::default(), TARGET_NETWORK);
    }

    #[test]
    fn test_from_id_prefers_named() {
        assert_eq!(Network::from_id(1), Network::Named(NamedNetwork::Mainnet));
        assert_eq!(Network::from_id(31337), Network::Id(31337));
        assert_eq!(Network::from_id(31337).named(), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("ganache".parse::<Network>().unwrap(), TARGET_NETWORK);
        assert_eq!("5777".parse::<Network>().unwrap(), TARGET_NETWORK);
        assert_eq!("42".parse::<Network>().unwrap(), Network::Id(42));
        assert!("not-a-network".parse::<Network>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(TARGET_NETWORK.to_string(), "ganache (5777)");
        assert_eq!(Network::Id(42).to_string(), "42");
    }

    proptest! {
        #[test]
        fn test_id_preserved(id in any::<u64>()) {
            let network = Network::from_id(id);
            prop_assert_eq!(network.id(), id);
            prop_assert_eq!(network.deployment_key(), id.to_string());
        }
    }
}
