//! Node data directory layout.
//!
//! ```text
//! <app_dir>/kaspa-<network>/datadir/{meta,consensus,utxoindex}
//! ```
//!
//! The root is passed explicitly; only [`StoreDirs::default_app_dir`]
//! consults the platform home directory.

use std::path::{Path, PathBuf};

use sompi_core::network::NetworkType;

use crate::error::StoreError;

/// Resolved paths of a node's stores for one network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreDirs {
    pub app_dir: PathBuf,
    pub network_dir: PathBuf,
    pub db_dir: PathBuf,
    /// Present only on nodes run with the UTXO index enabled.
    pub utxo_index_dir: PathBuf,
    pub meta_dir: PathBuf,
    pub consensus_dir: PathBuf,
}

impl StoreDirs {
    /// Lay out the directories under `app_dir`, or under the default app
    /// dir when `None`.
    pub fn new(app_dir: Option<PathBuf>, network: NetworkType) -> Result<Self, StoreError> {
        let app_dir = match app_dir {
            Some(dir) => dir,
            None => Self::default_app_dir()?,
        };
        Ok(Self::under(app_dir, network))
    }

    fn under(app_dir: PathBuf, network: NetworkType) -> Self {
        let network_dir = app_dir.join(format!("kaspa-{}", network.as_str()));
        let db_dir = network_dir.join("datadir");
        Self {
            utxo_index_dir: db_dir.join("utxoindex"),
            meta_dir: db_dir.join("meta"),
            consensus_dir: db_dir.join("consensus"),
            app_dir,
            network_dir,
            db_dir,
        }
    }

    /// `~/.rusty-kaspa`, or `%LOCALAPPDATA%\rusty-kaspa` on Windows.
    pub fn default_app_dir() -> Result<PathBuf, StoreError> {
        #[cfg(target_os = "windows")]
        let dir = ::dirs::data_local_dir().map(|d| d.join("rusty-kaspa"));
        #[cfg(not(target_os = "windows"))]
        let dir = ::dirs::home_dir().map(|d| d.join(".rusty-kaspa"));
        dir.ok_or(StoreError::NoHomeDir)
    }

    pub fn has_utxo_index(&self) -> bool {
        self.utxo_index_dir.is_dir()
    }

    /// Fails on the first required directory that does not exist. The UTXO
    /// index directory is optional.
    pub fn validate(&self) -> Result<(), StoreError> {
        let required: [&Path; 5] = [
            &self.app_dir,
            &self.network_dir,
            &self.db_dir,
            &self.meta_dir,
            &self.consensus_dir,
        ];
        match required.into_iter().find(|p| !p.is_dir()) {
            Some(missing) => Err(StoreError::MissingDirectory(missing.to_path_buf())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn layout_per_network() {
        let dirs = StoreDirs::new(Some(PathBuf::from("/srv/rk")), NetworkType::Testnet).unwrap();
        assert_eq!(dirs.network_dir, PathBuf::from("/srv/rk/kaspa-testnet"));
        assert_eq!(dirs.db_dir, PathBuf::from("/srv/rk/kaspa-testnet/datadir"));
        assert_eq!(dirs.utxo_index_dir, PathBuf::from("/srv/rk/kaspa-testnet/datadir/utxoindex"));
        assert_eq!(dirs.meta_dir, PathBuf::from("/srv/rk/kaspa-testnet/datadir/meta"));
        assert_eq!(dirs.consensus_dir, PathBuf::from("/srv/rk/kaspa-testnet/datadir/consensus"));
    }

    #[test]
    fn mainnet_is_explicit() {
        let dirs = StoreDirs::new(Some(PathBuf::from("/a")), NetworkType::default()).unwrap();
        assert_eq!(dirs.network_dir, PathBuf::from("/a/kaspa-mainnet"));
    }

    #[test]
    fn validate_reports_first_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = StoreDirs::new(Some(tmp.path().to_path_buf()), NetworkType::Mainnet).unwrap();
        match dirs.validate() {
            Err(StoreError::MissingDirectory(p)) => assert_eq!(p, dirs.network_dir),
            other => panic!("expected missing network dir, got {other:?}"),
        }

        fs::create_dir_all(&dirs.meta_dir).unwrap();
        match dirs.validate() {
            Err(StoreError::MissingDirectory(p)) => assert_eq!(p, dirs.consensus_dir),
            other => panic!("expected missing consensus dir, got {other:?}"),
        }

        fs::create_dir_all(&dirs.consensus_dir).unwrap();
        dirs.validate().unwrap();
        assert!(!dirs.has_utxo_index());

        fs::create_dir_all(&dirs.utxo_index_dir).unwrap();
        assert!(dirs.has_utxo_index());
    }
}
