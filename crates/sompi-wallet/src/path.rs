//! BIP-32 derivation paths.
//!
//! Canonical syntax is `m(/<index>['])*`. Indices are plain decimal below
//! 2^31 with no leading zeros, and `'` is the only hardened marker, so every
//! accepted string prints back unchanged.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use sompi_core::constants::{BIP44_PURPOSE, KASPA_COIN_TYPE};

use crate::error::WalletError;

/// First hardened index.
pub const HARDENED_OFFSET: u32 = 1 << 31;

/// Most steps a path may hold; extended keys record depth in one byte.
pub const MAX_PATH_DEPTH: usize = 255;

/// One derivation step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChildNumber {
    index: u32,
    hardened: bool,
}

impl ChildNumber {
    /// `index` must be below 2^31.
    pub fn new(index: u32, hardened: bool) -> Result<Self, WalletError> {
        if index >= HARDENED_OFFSET {
            return Err(WalletError::invalid_path(
                &index.to_string(),
                format!("index {index} is not below 2^31"),
            ));
        }
        Ok(Self { index, hardened })
    }

    pub fn normal(index: u32) -> Result<Self, WalletError> {
        Self::new(index, false)
    }

    pub fn hardened(index: u32) -> Result<Self, WalletError> {
        Self::new(index, true)
    }

    /// Index without the hardened bit.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn is_hardened(&self) -> bool {
        self.hardened
    }

    /// Wire form: the index with 2^31 added when hardened.
    pub fn to_u32(&self) -> u32 {
        if self.hardened {
            self.index | HARDENED_OFFSET
        } else {
            self.index
        }
    }

    pub fn from_u32(raw: u32) -> Self {
        Self {
            index: raw & !HARDENED_OFFSET,
            hardened: raw & HARDENED_OFFSET != 0,
        }
    }
}

impl fmt::Display for ChildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hardened {
            write!(f, "{}'", self.index)
        } else {
            write!(f, "{}", self.index)
        }
    }
}

/// An ordered list of derivation steps from the root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DerivationPath {
    steps: Vec<ChildNumber>,
}

impl DerivationPath {
    /// The empty path `m`.
    pub fn master() -> Self {
        Self::default()
    }

    pub fn parse(s: &str) -> Result<Self, WalletError> {
        let mut components = s.split('/');
        match components.next() {
            Some("m") => {}
            _ => return Err(WalletError::invalid_path(s, "path must start with \"m\"")),
        }
        let steps = components
            .map(|c| parse_component(s, c))
            .collect::<Result<Vec<_>, _>>()?;
        if steps.len() > MAX_PATH_DEPTH {
            return Err(WalletError::invalid_path(s, too_deep()));
        }
        Ok(Self { steps })
    }

    /// `m/44'/111111'/<account>'/<change>/<address_index>`
    pub fn bip44(account: u32, change: u32, address_index: u32) -> Result<Self, WalletError> {
        let mut path = Self::bip44_account(account)?;
        path.push(change, false)?;
        path.push(address_index, false)?;
        Ok(path)
    }

    /// `m/44'/111111'/<account>'`
    pub fn bip44_account(account: u32) -> Result<Self, WalletError> {
        let mut path = Self::master();
        path.push(BIP44_PURPOSE, true)?;
        path.push(KASPA_COIN_TYPE, true)?;
        path.push(account, true)?;
        Ok(path)
    }

    /// Append a step; fails when `index` is not below 2^31 or the path is
    /// already [`MAX_PATH_DEPTH`] steps long.
    pub fn push(&mut self, index: u32, hardened: bool) -> Result<&mut Self, WalletError> {
        if index >= HARDENED_OFFSET {
            return Err(WalletError::invalid_path(
                &format!("{self}/{index}"),
                format!("index {index} is not below 2^31"),
            ));
        }
        if self.steps.len() >= MAX_PATH_DEPTH {
            return Err(WalletError::invalid_path(&format!("{self}/{index}"), too_deep()));
        }
        self.steps.push(ChildNumber { index, hardened });
        Ok(self)
    }

    /// A copy with `child` appended.
    pub fn child(&self, child: ChildNumber) -> Result<Self, WalletError> {
        let mut path = self.clone();
        path.push(child.index, child.hardened)?;
        Ok(path)
    }

    pub fn steps(&self) -> &[ChildNumber] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn too_deep() -> String {
    format!("path is deeper than {MAX_PATH_DEPTH} steps")
}

fn parse_component(path: &str, component: &str) -> Result<ChildNumber, WalletError> {
    let (digits, hardened) = match component.strip_suffix('\'') {
        Some(rest) => (rest, true),
        None => (component, false),
    };
    if digits.is_empty() {
        return Err(WalletError::invalid_path(path, format!("empty component {component:?}")));
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WalletError::invalid_path(
            path,
            format!("component {component:?} is not a decimal index"),
        ));
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return Err(WalletError::invalid_path(
            path,
            format!("leading zero in component {component:?}"),
        ));
    }
    let index: u32 = digits
        .parse()
        .ok()
        .filter(|i| *i < HARDENED_OFFSET)
        .ok_or_else(|| {
            WalletError::invalid_path(path, format!("component {component:?} is not below 2^31"))
        })?;
    Ok(ChildNumber { index, hardened })
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for step in &self.steps {
            write!(f, "/{step}")?;
        }
        Ok(())
    }
}

impl FromStr for DerivationPath {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Vec<ChildNumber>> for DerivationPath {
    fn from(steps: Vec<ChildNumber>) -> Self {
        Self { steps }
    }
}

impl<'a> IntoIterator for &'a DerivationPath {
    type Item = &'a ChildNumber;
    type IntoIter = std::slice::Iter<'a, ChildNumber>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

impl Serialize for DerivationPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DerivationPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Anything `derive_path` accepts: a path string or a parsed path.
pub trait IntoDerivationPath {
    fn into_derivation_path(self) -> Result<DerivationPath, WalletError>;
}

impl IntoDerivationPath for &str {
    fn into_derivation_path(self) -> Result<DerivationPath, WalletError> {
        DerivationPath::parse(self)
    }
}

impl IntoDerivationPath for &String {
    fn into_derivation_path(self) -> Result<DerivationPath, WalletError> {
        DerivationPath::parse(self)
    }
}

impl IntoDerivationPath for &DerivationPath {
    fn into_derivation_path(self) -> Result<DerivationPath, WalletError> {
        Ok(self.clone())
    }
}

impl IntoDerivationPath for DerivationPath {
    fn into_derivation_path(self) -> Result<DerivationPath, WalletError> {
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reason(s: &str) -> String {
        match DerivationPath::parse(s).unwrap_err() {
            WalletError::InvalidPath { path, reason } => {
                assert_eq!(path, s);
                reason
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    // --- ChildNumber ---

    #[test]
    fn child_number_u32_roundtrip() {
        let h = ChildNumber::hardened(44).unwrap();
        assert_eq!(h.to_u32(), 0x8000_002c);
        assert_eq!(ChildNumber::from_u32(0x8000_002c), h);
        assert_eq!(ChildNumber::from_u32(5), ChildNumber::normal(5).unwrap());
    }

    #[test]
    fn child_number_rejects_large_index() {
        assert!(ChildNumber::new(HARDENED_OFFSET, false).is_err());
        assert!(ChildNumber::new(HARDENED_OFFSET - 1, true).is_ok());
    }

    // --- Parsing ---

    #[test]
    fn parse_master() {
        let p = DerivationPath::parse("m").unwrap();
        assert!(p.is_empty());
        assert_eq!(p.to_string(), "m");
    }

    #[test]
    fn parse_bip44_path() {
        let p: DerivationPath = "m/44'/111111'/0'/0/1".parse().unwrap();
        assert_eq!(p.len(), 5);
        assert!(p.steps()[2].is_hardened());
        assert!(!p.steps()[3].is_hardened());
        assert_eq!(p.steps()[1].index(), 111_111);
        assert_eq!(p, DerivationPath::bip44(0, 0, 1).unwrap());
    }

    #[test]
    fn display_roundtrips_exactly() {
        for s in ["m", "m/0", "m/0'", "m/2147483647'/1/0", "m/44'/111111'/3'/1/20"] {
            assert_eq!(DerivationPath::parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn zero_is_allowed() {
        assert_eq!(DerivationPath::parse("m/0/0'").unwrap().len(), 2);
    }

    #[test]
    fn leading_zero_rejected() {
        assert_eq!(reason("m/01"), "leading zero in component \"01\"");
        assert_eq!(reason("m/00'"), "leading zero in component \"00'\"");
    }

    #[test]
    fn missing_root_rejected() {
        assert_eq!(reason("44'/0"), "path must start with \"m\"");
        assert_eq!(reason(""), "path must start with \"m\"");
        assert_eq!(reason("M/0"), "path must start with \"m\"");
    }

    #[test]
    fn empty_components_rejected() {
        assert_eq!(reason("m/"), "empty component \"\"");
        assert_eq!(reason("m//1"), "empty component \"\"");
        assert_eq!(reason("m/'"), "empty component \"'\"");
    }

    #[test]
    fn alternative_hardened_markers_rejected() {
        assert_eq!(reason("m/44h"), "component \"44h\" is not a decimal index");
        assert_eq!(reason("m/44H"), "component \"44H\" is not a decimal index");
        assert_eq!(reason("m/44''"), "component \"44''\" is not a decimal index");
    }

    #[test]
    fn signs_and_whitespace_rejected() {
        assert!(DerivationPath::parse("m/+1").is_err());
        assert!(DerivationPath::parse("m/-1").is_err());
        assert!(DerivationPath::parse("m/ 1").is_err());
        assert!(DerivationPath::parse(" m/1").is_err());
    }

    #[test]
    fn out_of_range_rejected() {
        assert_eq!(reason("m/2147483648"), "component \"2147483648\" is not below 2^31");
        assert_eq!(reason("m/99999999999'"), "component \"99999999999'\" is not below 2^31");
    }

    // --- Construction ---

    #[test]
    fn push_validates_index() {
        let mut p = DerivationPath::master();
        p.push(1, true).unwrap().push(2, false).unwrap();
        assert_eq!(p.to_string(), "m/1'/2");
        assert!(matches!(
            p.push(HARDENED_OFFSET, false),
            Err(WalletError::InvalidPath { .. })
        ));
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn child_appends() {
        let account = DerivationPath::bip44_account(0).unwrap();
        let leaf = account.child(ChildNumber::normal(0).unwrap()).unwrap();
        assert_eq!(leaf.to_string(), "m/44'/111111'/0'/0");
        assert_eq!(account.len(), 3);
    }

    #[test]
    fn depth_is_capped() {
        let deepest = format!("m{}", "/0".repeat(MAX_PATH_DEPTH));
        let mut p = DerivationPath::parse(&deepest).unwrap();
        assert_eq!(p.len(), MAX_PATH_DEPTH);

        let too_deep = format!("{deepest}/0");
        assert_eq!(reason(&too_deep), "path is deeper than 255 steps");
        assert!(matches!(p.push(0, false), Err(WalletError::InvalidPath { .. })));
        assert!(p.child(ChildNumber::normal(1).unwrap()).is_err());
        assert_eq!(p.len(), MAX_PATH_DEPTH);
    }

    // --- Serde ---

    #[test]
    fn serde_as_string() {
        let p = DerivationPath::bip44(1, 0, 7).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"m/44'/111111'/1'/0/7\"");
        assert_eq!(serde_json::from_str::<DerivationPath>(&json).unwrap(), p);
        assert!(serde_json::from_str::<DerivationPath>("\"m/01\"").is_err());
    }

    // --- IntoDerivationPath ---

    #[test]
    fn string_and_object_forms_agree() {
        let s = "m/44'/111111'/0'";
        let parsed = DerivationPath::parse(s).unwrap();
        assert_eq!(s.into_derivation_path().unwrap(), (&parsed).into_derivation_path().unwrap());
    }

    // --- proptest ---

    fn component_strategy() -> impl Strategy<Value = (u32, bool)> {
        (0u32..HARDENED_OFFSET, any::<bool>())
    }

    proptest! {
        #[test]
        fn display_inverts_parse(steps in prop::collection::vec(component_strategy(), 0..12)) {
            let text: String = std::iter::once("m".to_string())
                .chain(steps.iter().map(|(i, h)| if *h { format!("{i}'") } else { i.to_string() }))
                .collect::<Vec<_>>()
                .join("/");
            let parsed = DerivationPath::parse(&text).unwrap();
            prop_assert_eq!(parsed.to_string(), text);
            prop_assert_eq!(parsed.len(), steps.len());
            for (step, (index, hardened)) in parsed.steps().iter().zip(&steps) {
                prop_assert_eq!(step.index(), *index);
                prop_assert_eq!(step.is_hardened(), *hardened);
            }
        }

        #[test]
        fn padded_components_rejected(index in 0u32..HARDENED_OFFSET, hardened in any::<bool>()) {
            let marker = if hardened { "'" } else { "" };
            let text = format!("m/0{index}{marker}");
            prop_assert!(DerivationPath::parse(&text).is_err());
        }
    }
}
