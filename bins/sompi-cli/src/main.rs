//! sompi-cli — offline key and transaction tool for Kaspa-style wallets.
//!
//! Generates and inspects mnemonics, derives addresses and extended keys,
//! and builds signed transactions from a UTXO snapshot. Nothing here talks
//! to a node.

mod config;

use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use sompi_core::address::{Address, Prefix};
use sompi_core::crypto::{PrivateKey, SigHashType};
use sompi_core::network::NetworkType;
use sompi_core::script::ScriptPublicKey;
use sompi_core::tx::{Transaction, TransactionOutpoint, UtxoEntry};
use sompi_store::{ExportOptions, IndexedUtxo, StoreDirs, export_address_balances, export_utxos};
use sompi_wallet::{
    ChangePolicy, CoinSelector, DerivationPath, ExtendedKey, ExtendedKeyPrefix, FeePolicy, Mnemonic,
    PaymentOutput, TransactionBuilder, TransactionSigner, UnsignedTransaction, WordCount,
};
use tracing::{debug, info};

use crate::config::{CliConfig, LogFormat};

const DEFAULT_PATH: &str = "m/44'/111111'/0'/0/0";

#[derive(Parser)]
#[command(name = "sompi-cli")]
#[command(version, about = "Offline HD keys and UTXO transactions for Kaspa-style wallets.")]
struct Cli {
    /// Network (mainnet, testnet, devnet, simnet). Overrides SOMPI_NETWORK.
    #[arg(long, global = true)]
    network: Option<NetworkType>,

    /// Log level filter when RUST_LOG is unset. Overrides SOMPI_LOG_LEVEL.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format. Overrides SOMPI_LOG_FORMAT.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mnemonic phrase subcommands.
    Mnemonic {
        #[command(subcommand)]
        action: MnemonicAction,
    },
    /// Derive an address and extended public key along a path.
    Derive(DeriveArgs),
    /// Extended key subcommands.
    Xkey {
        #[command(subcommand)]
        action: XkeyAction,
    },
    /// Derivation path subcommands.
    Path {
        #[command(subcommand)]
        action: PathAction,
    },
    /// Address subcommands.
    Address {
        #[command(subcommand)]
        action: AddressAction,
    },
    /// Transaction subcommands.
    Tx {
        #[command(subcommand)]
        action: TxAction,
    },
    /// Node store subcommands.
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(Subcommand)]
enum MnemonicAction {
    /// Generate a new random phrase.
    New {
        /// Number of words.
        #[arg(short, long, default_value = "24", value_parser = ["12", "24"])]
        words: String,
    },
    /// Print the 64-byte seed of a phrase as hex.
    Seed(PhraseArgs),
}

#[derive(Args)]
struct PhraseArgs {
    /// Mnemonic phrase. Prompted for without echo if omitted.
    #[arg(long)]
    phrase: Option<String>,

    /// Prompt for a BIP-39 passphrase.
    #[arg(long)]
    passphrase: bool,
}

#[derive(Args)]
struct DeriveArgs {
    #[command(flatten)]
    phrase: PhraseArgs,

    /// Start from an extended key instead of a phrase. The path is then
    /// relative to it and the network comes from the key's prefix.
    #[arg(long, conflicts_with = "phrase")]
    xkey: Option<String>,

    /// Derivation path.
    #[arg(short, long, default_value = DEFAULT_PATH)]
    path: String,

    /// Also print the ECDSA address.
    #[arg(long)]
    ecdsa: bool,
}

#[derive(Subcommand)]
enum XkeyAction {
    /// Re-encode an extended key under another prefix.
    Convert {
        /// Extended key string.
        key: String,

        /// Target prefix.
        #[arg(long, value_enum)]
        to: PrefixArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PrefixArg {
    Kprv,
    Kpub,
    Ktrv,
    Ktub,
    Xprv,
    Xpub,
    Tprv,
    Tpub,
}

impl From<PrefixArg> for ExtendedKeyPrefix {
    fn from(arg: PrefixArg) -> Self {
        match arg {
            PrefixArg::Kprv => ExtendedKeyPrefix::Kprv,
            PrefixArg::Kpub => ExtendedKeyPrefix::Kpub,
            PrefixArg::Ktrv => ExtendedKeyPrefix::Ktrv,
            PrefixArg::Ktub => ExtendedKeyPrefix::Ktub,
            PrefixArg::Xprv => ExtendedKeyPrefix::Xprv,
            PrefixArg::Xpub => ExtendedKeyPrefix::Xpub,
            PrefixArg::Tprv => ExtendedKeyPrefix::Tprv,
            PrefixArg::Tpub => ExtendedKeyPrefix::Tpub,
        }
    }
}

#[derive(Subcommand)]
enum PathAction {
    /// Validate a path and print its canonical form.
    Check { path: String },
}

#[derive(Subcommand)]
enum AddressAction {
    /// Decode an address into its parts.
    Decode { address: String },
}

#[derive(Subcommand)]
enum TxAction {
    /// Select, build and sign a transaction from a UTXO snapshot.
    Create(TxCreateArgs),
    /// Sign a transaction produced by `tx create --unsigned`.
    Sign(TxSignArgs),
}

#[derive(Args)]
struct TxCreateArgs {
    /// JSON file holding an array of UTXO entries.
    #[arg(long)]
    utxos: PathBuf,

    /// Payment as ADDRESS:SOMPI. Repeatable.
    #[arg(long = "to", required = true)]
    outputs: Vec<String>,

    /// Hex private key. Prompted for without echo if omitted.
    #[arg(long)]
    key: Option<String>,

    /// Change address. Defaults to the signing key's address.
    #[arg(long)]
    change: Option<String>,

    /// Sompi per gram of mass. Overrides SOMPI_FEE_RATE.
    #[arg(long)]
    fee_rate: Option<f64>,

    /// Emit the transaction without signing it.
    #[arg(long, requires = "change", conflicts_with = "key")]
    unsigned: bool,

    /// Write the transaction here instead of stdout.
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct TxSignArgs {
    /// JSON file holding a transaction, bare or as written by `tx create`.
    #[arg(long)]
    tx: PathBuf,

    /// JSON file holding the UTXO entries the transaction spends.
    #[arg(long)]
    utxos: PathBuf,

    /// Hex private key. Prompted for without echo if omitted.
    #[arg(long)]
    key: Option<String>,

    /// Write the signed transaction here instead of stdout.
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Subcommand)]
enum StoreAction {
    /// Print and validate the store directory layout.
    Layout {
        /// App directory. Defaults to ~/.rusty-kaspa.
        #[arg(long)]
        app_dir: Option<PathBuf>,
    },
    /// Export UTXO index records from a JSON dump as CSV on stdout.
    Export(StoreExportArgs),
}

#[derive(Args)]
struct StoreExportArgs {
    /// JSON file holding an array of UTXO index records.
    #[arg(long)]
    records: PathBuf,

    /// Sum amounts per address instead of one row per UTXO.
    #[arg(long)]
    balances: bool,

    /// Include transaction id and index columns.
    #[arg(long)]
    outpoint: bool,

    /// Omit the address column.
    #[arg(long)]
    no_address: bool,

    /// Omit the DAA score column.
    #[arg(long)]
    no_daa_score: bool,

    /// Omit the amount column.
    #[arg(long)]
    no_amount: bool,

    /// Omit the coinbase column.
    #[arg(long)]
    no_coinbase: bool,

    /// Records per progress batch.
    #[arg(long, default_value_t = sompi_store::export::DEFAULT_BATCH_SIZE)]
    batch_size: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CliConfig::from_env()?;
    if let Some(network) = cli.network {
        config.network = network;
    }
    if let Some(level) = cli.log_level.clone() {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    init_logging(&config.log_level, config.log_format);
    debug!(network = %config.network, "configuration loaded");

    match cli.command {
        Commands::Mnemonic { action } => match action {
            MnemonicAction::New { words } => mnemonic_new(&words),
            MnemonicAction::Seed(args) => mnemonic_seed(args),
        },
        Commands::Derive(args) => derive(args, &config),
        Commands::Xkey { action } => match action {
            XkeyAction::Convert { key, to } => xkey_convert(&key, to.into()),
        },
        Commands::Path { action } => match action {
            PathAction::Check { path } => path_check(&path),
        },
        Commands::Address { action } => match action {
            AddressAction::Decode { address } => address_decode(&address),
        },
        Commands::Tx { action } => match action {
            TxAction::Create(args) => tx_create(args, &config),
            TxAction::Sign(args) => tx_sign(args),
        },
        Commands::Store { action } => match action {
            StoreAction::Layout { app_dir } => store_layout(app_dir, &config),
            StoreAction::Export(args) => store_export(args, &config),
        },
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(io::stderr))
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(io::stderr))
            .init(),
    }
}

fn mnemonic_new(words: &str) -> Result<()> {
    let count = if words == "12" { WordCount::Words12 } else { WordCount::Words24 };
    let mnemonic = Mnemonic::random(count);
    println!("{}", mnemonic.phrase());
    Ok(())
}

fn mnemonic_seed(args: PhraseArgs) -> Result<()> {
    let (mnemonic, passphrase) = read_phrase(&args)?;
    let seed = mnemonic.to_seed(&passphrase);
    println!("{}", hex::encode(seed.as_bytes()));
    Ok(())
}

fn derive(args: DeriveArgs, config: &CliConfig) -> Result<()> {
    let root = match &args.xkey {
        Some(s) => ExtendedKey::from_string(s.trim()).context("invalid extended key")?,
        None => {
            let (mnemonic, passphrase) = read_phrase(&args.phrase)?;
            ExtendedKey::from_seed(mnemonic.to_seed(&passphrase).as_bytes())
                .context("seed does not yield a valid master key")?
                .for_network(config.network)
        }
    };
    let path = DerivationPath::parse(&args.path).context("invalid derivation path")?;
    let key = root
        .derive_path(&path)
        .with_context(|| format!("derivation along {path} failed"))?;

    let network = if args.xkey.is_some() { key.network() } else { config.network };
    let prefix = Prefix::from(network);
    let public = key.to_public();
    let mut out = json!({
        "path": path.to_string(),
        "network": network.as_str(),
        "address": public.public_key().to_address(prefix).to_string(),
        "extended_public_key": public.into_string(public.default_prefix())?,
        "depth": key.depth(),
    });
    if args.ecdsa {
        out["address_ecdsa"] = json!(public.public_key().to_address_ecdsa(prefix).to_string());
    }
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn xkey_convert(key: &str, to: ExtendedKeyPrefix) -> Result<()> {
    let parsed = ExtendedKey::from_string(key.trim()).context("invalid extended key")?;
    let source = if to.is_private() { parsed } else { parsed.to_public() };
    let encoded = source
        .for_network(to.network())
        .into_string(to)
        .with_context(|| format!("cannot convert to {to}"))?;
    println!("{encoded}");
    Ok(())
}

fn path_check(path: &str) -> Result<()> {
    let parsed = DerivationPath::parse(path).context("invalid derivation path")?;
    let steps: Vec<_> = parsed
        .steps()
        .iter()
        .map(|c| json!({ "index": c.index(), "hardened": c.is_hardened() }))
        .collect();
    let out = json!({ "path": parsed.to_string(), "depth": parsed.len(), "steps": steps });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn address_decode(address: &str) -> Result<()> {
    let parsed = Address::decode(address.trim()).context("invalid address")?;
    let script = ScriptPublicKey::pay_to_address(&parsed);
    let out = json!({
        "address": parsed.to_string(),
        "prefix": parsed.prefix().as_str(),
        "network": parsed.prefix().network_type().as_str(),
        "version": format!("{:?}", parsed.version()),
        "payload": hex::encode(parsed.payload()),
        "script_public_key": script,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn tx_create(args: TxCreateArgs, config: &CliConfig) -> Result<()> {
    let utxos = read_utxos(&args.utxos)?;
    let outputs = args
        .outputs
        .iter()
        .map(|s| parse_payment(s))
        .collect::<Result<Vec<_>>>()?;

    let key = if args.unsigned { None } else { Some(read_key(args.key.as_deref())?) };
    let prefix = Prefix::from(config.network);
    let change = match (&args.change, &key) {
        (Some(s), _) => Address::decode(s.trim()).context("invalid change address")?,
        (None, Some(key)) => key.public_key().to_address(prefix),
        (None, None) => bail!("--change is required without a signing key"),
    };

    let mut scripts: Vec<ScriptPublicKey> =
        outputs.iter().map(|o| ScriptPublicKey::pay_to_address(&o.address)).collect();
    scripts.push(ScriptPublicKey::pay_to_address(&change));
    let fee_policy = FeePolicy::from_feerate(args.fee_rate.unwrap_or(config.fee_rate), &scripts);

    let selection = CoinSelector::select(&utxos, &outputs, &fee_policy).context("coin selection failed")?;
    info!(
        inputs = selection.selected.len(),
        fee = selection.fee,
        change = selection.change,
        "selected inputs"
    );

    let mut builder = TransactionBuilder::new();
    builder
        .set_outputs(outputs)
        .set_dust_threshold(config.dust_threshold)
        .set_change_policy(ChangePolicy::To(change));
    let unsigned = builder.build_from_selection(&selection).context("failed to build transaction")?;

    match key {
        Some(key) => sign_and_write(unsigned, &key, args.out.as_ref()),
        None => {
            let out = json!({
                "id": unsigned.id().to_string(),
                "fee": unsigned.fee(),
                "transaction": unsigned.tx(),
            });
            write_output(&out, args.out.as_ref(), "unsigned")
        }
    }
}

fn tx_sign(args: TxSignArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.tx).with_context(|| format!("failed to read {}", args.tx.display()))?;
    let tx = parse_transaction(&raw)?;
    let utxos = read_utxos(&args.utxos)?;
    let entries = entries_for(&tx, &utxos)?;
    let unsigned = UnsignedTransaction::from_parts(tx, entries).context("transaction does not match its UTXOs")?;
    let key = read_key(args.key.as_deref())?;
    sign_and_write(unsigned, &key, args.out.as_ref())
}

fn sign_and_write(mut unsigned: UnsignedTransaction, key: &PrivateKey, out: Option<&PathBuf>) -> Result<()> {
    TransactionSigner::sign(&mut unsigned, std::slice::from_ref(key), SigHashType::ALL).context("signing failed")?;
    let signed = unsigned.finalize()?;
    signed.verify().context("signed transaction does not verify")?;
    let value = json!({
        "id": signed.id().to_string(),
        "fee": signed.fee(),
        "transaction": signed.tx(),
    });
    write_output(&value, out, "signed")
}

fn write_output(value: &serde_json::Value, out: Option<&PathBuf>, kind: &str) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), kind, "wrote transaction");
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn read_utxos(path: &PathBuf) -> Result<Vec<UtxoEntry>> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).context("invalid UTXO JSON")
}

fn read_key(hex: Option<&str>) -> Result<PrivateKey> {
    let hex = match hex {
        Some(hex) => hex.to_string(),
        None => prompt_secret("Private key (hex)")?,
    };
    hex.trim().parse().context("invalid private key")
}

/// Accept a bare transaction or the `{"transaction": ...}` wrapper that
/// `tx create` writes.
fn parse_transaction(raw: &str) -> Result<Transaction> {
    let mut value: serde_json::Value = serde_json::from_str(raw).context("invalid transaction JSON")?;
    if let Some(inner) = value.get_mut("transaction") {
        value = inner.take();
    }
    serde_json::from_value(value).context("invalid transaction JSON")
}

/// The entry each input spends, in input order.
fn entries_for(tx: &Transaction, utxos: &[UtxoEntry]) -> Result<Vec<UtxoEntry>> {
    tx.inputs
        .iter()
        .map(|input| {
            let TransactionOutpoint { transaction_id, index } = input.previous_outpoint;
            utxos
                .iter()
                .find(|e| e.outpoint == input.previous_outpoint)
                .cloned()
                .with_context(|| format!("no UTXO entry for outpoint {transaction_id}:{index}"))
        })
        .collect()
}

fn store_layout(app_dir: Option<PathBuf>, config: &CliConfig) -> Result<()> {
    let dirs = StoreDirs::new(app_dir, config.network)?;
    let valid = dirs.validate();
    let out = json!({
        "app_dir": dirs.app_dir,
        "network_dir": dirs.network_dir,
        "db_dir": dirs.db_dir,
        "meta_dir": dirs.meta_dir,
        "consensus_dir": dirs.consensus_dir,
        "utxo_index_dir": dirs.utxo_index_dir,
        "has_utxo_index": dirs.has_utxo_index(),
        "valid": valid.is_ok(),
        "error": valid.err().map(|e| e.to_string()),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn store_export(args: StoreExportArgs, config: &CliConfig) -> Result<()> {
    let raw = fs::read_to_string(&args.records)
        .with_context(|| format!("failed to read {}", args.records.display()))?;
    let records: Vec<IndexedUtxo> = serde_json::from_str(&raw).context("invalid record JSON")?;
    let prefix = Prefix::from(config.network);
    let stdout = io::stdout().lock();

    if args.balances {
        let addresses = export_address_balances(stdout, records.into_iter().map(Ok), prefix)?;
        info!(addresses, "export complete");
    } else {
        let options = ExportOptions {
            address: !args.no_address,
            daa_score: !args.no_daa_score,
            amount: !args.no_amount,
            is_coinbase: !args.no_coinbase,
            outpoint: args.outpoint,
            batch_size: args.batch_size,
            prefix,
        };
        let summary = export_utxos(stdout, records.into_iter().map(Ok), options)?;
        info!(records = summary.records, batches = summary.batches, "export complete");
    }
    Ok(())
}

/// Parse `ADDRESS:SOMPI`. The address itself contains a colon, so split on
/// the last one.
fn parse_payment(s: &str) -> Result<PaymentOutput> {
    let Some((address, amount)) = s.rsplit_once(':') else {
        bail!("payment {s:?} must be ADDRESS:SOMPI");
    };
    let address = Address::decode(address).with_context(|| format!("invalid address in {s:?}"))?;
    let amount: u64 = amount.parse().with_context(|| format!("invalid amount in {s:?}"))?;
    Ok(PaymentOutput::new(address, amount))
}

fn read_phrase(args: &PhraseArgs) -> Result<(Mnemonic, String)> {
    let phrase = match &args.phrase {
        Some(p) => p.clone(),
        None => prompt_secret("Mnemonic phrase")?,
    };
    let mnemonic = Mnemonic::from_phrase(phrase.trim()).context("invalid mnemonic phrase")?;
    let passphrase = if args.passphrase { prompt_secret("BIP-39 passphrase")? } else { String::new() };
    Ok((mnemonic, passphrase))
}

/// Prompt without echo.
fn prompt_secret(prompt: &str) -> Result<String> {
    rpassword::prompt_password(format!("{prompt}: ")).context("failed to read input")
}
