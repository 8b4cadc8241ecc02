//! BIP-44 account keychain.
//!
//! An [`Account`] owns the private node `m/44'/111111'/<account>'` and its
//! receive (`/0`) and change (`/1`) chains. Addresses are handed out in
//! index order, and every derived key is indexed by the pay-to-pubkey
//! script it locks so the signer can find the key for a spent UTXO.

use std::collections::HashMap;
use std::fmt;

use sompi_core::address::{Address, Prefix};
use sompi_core::crypto::PrivateKey;
use sompi_core::script::ScriptPublicKey;
use tracing::{debug, warn};

use crate::error::WalletError;
use crate::path::DerivationPath;
use crate::xkey::ExtendedKey;

/// Which branch of an account a key belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Chain {
    Receive = 0,
    Change = 1,
}

/// A derived key and the address it controls.
#[derive(Clone, Debug)]
pub struct DerivedKey {
    pub chain: Chain,
    pub index: u32,
    pub address: Address,
    private_key: PrivateKey,
}

impl DerivedKey {
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }
}

/// Deterministic keychain for one BIP-44 account.
pub struct Account {
    account_index: u32,
    prefix: Prefix,
    account_key: ExtendedKey,
    receive_chain: ExtendedKey,
    change_chain: ExtendedKey,
    next_receive: u32,
    next_change: u32,
    keys: HashMap<(Chain, u32), DerivedKey>,
    /// Reverse lookup: locking script -> (chain, index).
    script_to_key: HashMap<ScriptPublicKey, (Chain, u32)>,
}

impl Account {
    /// Derive the account node from a private master key.
    pub fn new(master: &ExtendedKey, account_index: u32, prefix: Prefix) -> Result<Self, WalletError> {
        let account_key = master.derive_path(&DerivationPath::bip44_account(account_index)?)?;
        let receive_chain = account_key.derive_child(Chain::Receive as u32, false)?;
        let change_chain = account_key.derive_child(Chain::Change as u32, false)?;
        Ok(Self {
            account_index,
            prefix,
            account_key,
            receive_chain,
            change_chain,
            next_receive: 0,
            next_change: 0,
            keys: HashMap::new(),
            script_to_key: HashMap::new(),
        })
    }

    pub fn account_index(&self) -> u32 {
        self.account_index
    }

    pub fn prefix(&self) -> Prefix {
        self.prefix
    }

    /// The account's extended public key, for watch-only use.
    pub fn extended_public_key(&self) -> ExtendedKey {
        self.account_key.to_public()
    }

    /// Derive (or fetch) the key at `chain/index`.
    pub fn key_at(&mut self, chain: Chain, index: u32) -> Result<&DerivedKey, WalletError> {
        if !self.keys.contains_key(&(chain, index)) {
            let parent = match chain {
                Chain::Receive => &self.receive_chain,
                Chain::Change => &self.change_chain,
            };
            let xkey = parent.derive_child(index, false)?;
            let private_key = xkey
                .private_key()
                .ok_or_else(|| WalletError::InvalidEncoding("account key is public-only".into()))?;
            let address = xkey.public_key().to_address(self.prefix);
            let script = ScriptPublicKey::pay_to_address(&address);
            debug!(?chain, index, %address, "derived account key");
            self.script_to_key.insert(script, (chain, index));
            self.keys.insert(
                (chain, index),
                DerivedKey { chain, index, address, private_key },
            );
        }
        self.keys
            .get(&(chain, index))
            .ok_or_else(|| WalletError::InvalidChildKey(index))
    }

    pub fn receive_address_at(&mut self, index: u32) -> Result<Address, WalletError> {
        Ok(self.key_at(Chain::Receive, index)?.address.clone())
    }

    pub fn change_address_at(&mut self, index: u32) -> Result<Address, WalletError> {
        Ok(self.key_at(Chain::Change, index)?.address.clone())
    }

    /// Next unused receive address, advancing the receive index.
    pub fn next_receive_address(&mut self) -> Result<Address, WalletError> {
        self.next_address(Chain::Receive)
    }

    /// Next unused change address, advancing the change index.
    pub fn next_change_address(&mut self) -> Result<Address, WalletError> {
        self.next_address(Chain::Change)
    }

    /// Next unused change address and its index, without advancing.
    pub fn peek_change_address(&mut self) -> Result<(u32, Address), WalletError> {
        self.peek_address(Chain::Change)
    }

    /// Mark change indices up to and including `index` as used.
    pub fn commit_change_index(&mut self, index: u32) -> Result<(), WalletError> {
        let next = index.checked_add(1).ok_or(WalletError::InvalidChildKey(index))?;
        self.next_change = self.next_change.max(next);
        Ok(())
    }

    fn next_address(&mut self, chain: Chain) -> Result<Address, WalletError> {
        let (index, address) = self.peek_address(chain)?;
        let next = index.checked_add(1).ok_or(WalletError::InvalidChildKey(index))?;
        match chain {
            Chain::Receive => self.next_receive = self.next_receive.max(next),
            Chain::Change => self.next_change = self.next_change.max(next),
        }
        Ok(address)
    }

    /// First derivable index at or after the chain's cursor.
    fn peek_address(&mut self, chain: Chain) -> Result<(u32, Address), WalletError> {
        let mut index = match chain {
            Chain::Receive => self.next_receive,
            Chain::Change => self.next_change,
        };
        loop {
            match self.key_at(chain, index) {
                Ok(key) => return Ok((index, key.address.clone())),
                Err(WalletError::InvalidChildKey(i)) => {
                    warn!(?chain, index = i, "skipping invalid child key");
                }
                Err(e) => return Err(e),
            }
            index = index.checked_add(1).ok_or(WalletError::InvalidChildKey(index))?;
        }
    }

    /// Rebuild the key cache for the first `receive` and `change` indices.
    pub fn restore(&mut self, receive: u32, change: u32) -> Result<(), WalletError> {
        for i in 0..receive {
            self.key_at(Chain::Receive, i)?;
        }
        for i in 0..change {
            self.key_at(Chain::Change, i)?;
        }
        self.next_receive = self.next_receive.max(receive);
        self.next_change = self.next_change.max(change);
        Ok(())
    }

    pub fn next_receive_index(&self) -> u32 {
        self.next_receive
    }

    pub fn next_change_index(&self) -> u32 {
        self.next_change
    }

    /// The key whose pay-to-pubkey script is `script`, if derived.
    pub fn private_key_for_script(&self, script: &ScriptPublicKey) -> Option<&PrivateKey> {
        self.script_to_key
            .get(script)
            .and_then(|k| self.keys.get(k))
            .map(DerivedKey::private_key)
    }

    /// Every derived private key, for handing to the signer.
    pub fn signing_keys(&self) -> Vec<PrivateKey> {
        self.keys.values().map(|k| k.private_key.clone()).collect()
    }

    /// Every derived address, receive chain first, each chain in index order.
    pub fn addresses(&self) -> Vec<Address> {
        let mut keys: Vec<&DerivedKey> = self.keys.values().collect();
        keys.sort_by_key(|k| (k.chain as u8, k.index));
        keys.into_iter().map(|k| k.address.clone()).collect()
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("account_index", &self.account_index)
            .field("prefix", &self.prefix)
            .field("next_receive", &self.next_receive)
            .field("next_change", &self.next_change)
            .field("cached_keys", &self.keys.len())
            .finish()
    }
}
