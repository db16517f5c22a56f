//! Well-known networks.

use core::fmt;

/// A network with a well-known id.
///
/// Parses from and displays as its kebab-case name (`"ganache"`); converts
/// from its numeric id with `TryFrom<u64>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[derive(strum::EnumString, strum::IntoStaticStr)]
#[derive(num_enum::TryFromPrimitive)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[repr(u64)]
#[non_exhaustive]
pub enum NamedNetwork {
    /// Ethereum mainnet.
    Mainnet = 1,
    /// A generic development chain.
    Dev = 1337,
    /// A local Ganache workspace.
    Ganache = 5777,
    /// The Sepolia testnet.
    Sepolia = 11_155_111,
}

impl Default for NamedNetwork {
    fn default() -> Self {
        Self::Ganache
    }
}

impl NamedNetwork {
    /// Returns the network id descriptors key deployments by.
    pub const fn id(self) -> u64 {
        self as u64
    }

    /// Returns the network's name.
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for NamedNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [(NamedNetwork, &str, u64); 4] = [
        (NamedNetwork::Mainnet, "mainnet", 1),
        (NamedNetwork::Dev, "dev", 1337),
        (NamedNetwork::Ganache, "ganache", 5777),
        (NamedNetwork::Sepolia, "sepolia", 11_155_111),
    ];

    #[test]
    fn test_names_and_ids() {
        for (network, name, id) in ALL {
            assert_eq!(network.to_string(), name);
            assert_eq!(name.parse::<NamedNetwork>().unwrap(), network);
            assert_eq!(network.id(), id);
            assert_eq!(NamedNetwork::try_from(id).unwrap(), network);
        }
    }

    #[test]
    fn test_unknown() {
        assert!("goerli".parse::<NamedNetwork>().is_err());
        assert!(NamedNetwork::try_from(42u64).is_err());
        assert_eq!("Ganache".parse::<NamedNetwork>().unwrap(), NamedNetwork::Ganache);
    }

    #[test]
    fn test_default_is_ganache() {
        assert_eq!(NamedNetwork::default().id(), 5777);
    }
}
