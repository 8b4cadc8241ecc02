//! Network identity.
//!
//! A [`NetworkType`] names the chain family; a [`NetworkId`] additionally
//! carries the numbered testnet instance (`testnet-10`, `testnet-11`).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::NetworkError;

/// The chain family a key, address or transaction belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NetworkType {
    #[default]
    Mainnet,
    Testnet,
    Devnet,
    Simnet,
}

impl NetworkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkType::Mainnet => "mainnet",
            NetworkType::Testnet => "testnet",
            NetworkType::Devnet => "devnet",
            NetworkType::Simnet => "simnet",
        }
    }

    /// Whether extended keys on this network use the test version bytes.
    pub fn is_test(&self) -> bool {
        !matches!(self, NetworkType::Mainnet)
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkType {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(NetworkType::Mainnet),
            "testnet" => Ok(NetworkType::Testnet),
            "devnet" => Ok(NetworkType::Devnet),
            "simnet" => Ok(NetworkType::Simnet),
            other => Err(NetworkError::UnknownNetworkType(other.to_string())),
        }
    }
}

/// A network type plus the optional testnet instance number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NetworkId {
    network_type: NetworkType,
    suffix: Option<u32>,
}

impl NetworkId {
    /// Build an id for a network type that takes no suffix.
    pub fn new(network_type: NetworkType) -> Result<Self, NetworkError> {
        if network_type == NetworkType::Testnet {
            return Err(NetworkError::MissingSuffix(network_type.to_string()));
        }
        Ok(Self { network_type, suffix: None })
    }

    /// Build an id for a numbered network instance.
    pub fn with_suffix(network_type: NetworkType, suffix: u32) -> Result<Self, NetworkError> {
        if network_type != NetworkType::Testnet {
            return Err(NetworkError::UnexpectedSuffix(network_type.to_string()));
        }
        Ok(Self { network_type, suffix: Some(suffix) })
    }

    pub const fn mainnet() -> Self {
        Self { network_type: NetworkType::Mainnet, suffix: None }
    }

    pub const fn testnet(suffix: u32) -> Self {
        Self { network_type: NetworkType::Testnet, suffix: Some(suffix) }
    }

    pub fn network_type(&self) -> NetworkType {
        self.network_type
    }

    pub fn suffix(&self) -> Option<u32> {
        self.suffix
    }
}

impl Default for NetworkId {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl From<NetworkId> for NetworkType {
    fn from(id: NetworkId) -> Self {
        id.network_type
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.suffix {
            Some(suffix) => write!(f, "{}-{suffix}", self.network_type),
            None => write!(f, "{}", self.network_type),
        }
    }
}

impl FromStr for NetworkId {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, '-');
        let network_type: NetworkType = parts.next().unwrap_or_default().parse()?;
        match parts.next() {
            None => Self::new(network_type),
            Some(raw) => {
                let suffix = raw
                    .parse::<u32>()
                    .map_err(|_| NetworkError::InvalidSuffix(raw.to_string()))?;
                Self::with_suffix(network_type, suffix)
            }
        }
    }
}

impl Serialize for NetworkId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NetworkId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
