//! Builder configuration

use serde::{Deserialize, Serialize};

use crate::{Error, Network, NetworkParams, Result, Satoshi};

/// Settings shared by every transaction the builder assembles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderConfig {
    /// Network (mainnet or testnet)
    #[serde(default)]
    pub network: Network,

    /// Fee used when a request does not carry one
    #[serde(default = "default_fee")]
    pub default_fee: Satoshi,

    /// Fee per kilobyte. Carried for callers, not used by the cost formula.
    #[serde(default = "default_fee_per_kb")]
    pub default_fee_per_kb: Satoshi,

    /// Value given to every ordinary asset-carrying or change output
    #[serde(default = "default_dust")]
    pub min_dust_value: Satoshi,

    /// Value given to the overflow output holding metadata
    #[serde(default = "default_dust")]
    pub min_dust_value_multisig: Satoshi,

    /// Allow metadata that does not fit the commitment output to move into
    /// a separate multisig-template output
    #[serde(default = "default_write_multisig")]
    pub write_multisig: bool,

    /// Largest payload a commitment output may carry
    #[serde(default = "default_max_payload_size")]
    pub max_payload_size: usize,
}

fn default_fee() -> Satoshi {
    10_000
}

fn default_fee_per_kb() -> Satoshi {
    25_000
}

fn default_dust() -> Satoshi {
    5741
}

fn default_write_multisig() -> bool {
    true
}

fn default_max_payload_size() -> usize {
    80
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            default_fee: default_fee(),
            default_fee_per_kb: default_fee_per_kb(),
            min_dust_value: default_dust(),
            min_dust_value_multisig: default_dust(),
            write_multisig: default_write_multisig(),
            max_payload_size: default_max_payload_size(),
        }
    }
}

impl BuilderConfig {
    /// Default configuration for a network
    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON, filling unset fields with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn params(&self) -> &'static NetworkParams {
        self.network.params()
    }

    /// Reject settings that can never produce a valid transaction
    pub fn validate(&self) -> Result<()> {
        let dust_threshold = self.params().dust_threshold;
        if self.min_dust_value < dust_threshold {
            return Err(Error::Config(format!(
                "minDustValue {} is below the network dust threshold {}",
                self.min_dust_value, dust_threshold
            )));
        }
        if self.write_multisig && self.min_dust_value_multisig < dust_threshold {
            return Err(Error::Config(format!(
                "minDustValueMultisig {} is below the network dust threshold {}",
                self.min_dust_value_multisig, dust_threshold
            )));
        }
        // marker + version + opcode
        if self.max_payload_size < 4 {
            return Err(Error::Config(format!(
                "maxPayloadSize {} cannot hold the payload header",
                self.max_payload_size
            )));
        }
        Ok(())
    }
}
