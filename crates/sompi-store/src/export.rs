//! Delimited export of UTXO index records.

use std::collections::BTreeMap;
use std::io;

use sompi_core::address::Prefix;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::reader::IndexedUtxo;

/// Default number of records per progress batch.
pub const DEFAULT_BATCH_SIZE: usize = 1_000;

/// Which columns to write and how to batch them.
///
/// Column order is fixed: `address, daa_score, amount, is_coinbase`, then
/// `transaction_id, transaction_index` when `outpoint` is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    pub address: bool,
    pub daa_score: bool,
    pub amount: bool,
    pub is_coinbase: bool,
    pub outpoint: bool,
    pub batch_size: usize,
    /// Address prefix used to render scripts.
    pub prefix: Prefix,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            address: true,
            daa_score: true,
            amount: true,
            is_coinbase: true,
            outpoint: false,
            batch_size: DEFAULT_BATCH_SIZE,
            prefix: Prefix::Mainnet,
        }
    }
}

impl ExportOptions {
    fn header(&self) -> Vec<&'static str> {
        let mut cols = Vec::with_capacity(6);
        if self.address {
            cols.push("address");
        }
        if self.daa_score {
            cols.push("daa_score");
        }
        if self.amount {
            cols.push("amount");
        }
        if self.is_coinbase {
            cols.push("is_coinbase");
        }
        if self.outpoint {
            cols.push("transaction_id");
            cols.push("transaction_index");
        }
        cols
    }

    fn validate(&self) -> Result<(), StoreError> {
        if self.batch_size == 0 {
            return Err(StoreError::InvalidBatchSize);
        }
        if self.header().is_empty() {
            return Err(StoreError::NoFieldsSelected);
        }
        Ok(())
    }

    fn row(&self, record: &IndexedUtxo) -> Result<Vec<String>, StoreError> {
        let mut row = Vec::with_capacity(6);
        if self.address {
            row.push(render_address(record, self.prefix)?);
        }
        if self.daa_score {
            row.push(record.block_daa_score.to_string());
        }
        if self.amount {
            row.push(record.amount.to_string());
        }
        if self.is_coinbase {
            row.push(if record.is_coinbase { "t" } else { "f" }.to_string());
        }
        if self.outpoint {
            row.push(record.outpoint.transaction_id.to_string());
            row.push(record.outpoint.index.to_string());
        }
        Ok(row)
    }
}

/// Counts reported by an export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Data rows written, header excluded.
    pub records: u64,
    pub batches: u64,
}

fn render_address(record: &IndexedUtxo, prefix: Prefix) -> Result<String, StoreError> {
    record
        .script_public_key
        .to_address(prefix)
        .map(|a| a.to_string())
        .map_err(|_| StoreError::UnresolvableScript {
            script: hex::encode(&record.script_public_key.script),
        })
}

/// Write one row per record to `writer`.
///
/// The writer is flushed and progress logged at each batch boundary. A
/// record that fails to read or render aborts the export; rows already
/// flushed stay written.
pub fn export_utxos<W, I>(writer: W, records: I, options: ExportOptions) -> Result<ExportSummary, StoreError>
where
    W: io::Write,
    I: IntoIterator<Item = Result<IndexedUtxo, StoreError>>,
{
    options.validate()?;
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(options.header())?;

    let mut summary = ExportSummary::default();
    let mut in_batch = 0usize;
    for record in records {
        let record = record?;
        out.write_record(options.row(&record)?)?;
        summary.records += 1;
        in_batch += 1;
        if in_batch == options.batch_size {
            out.flush()?;
            summary.batches += 1;
            in_batch = 0;
            info!(batch = summary.batches, records = summary.records, "exported batch");
        }
    }
    if in_batch > 0 {
        summary.batches += 1;
        info!(batch = summary.batches, records = summary.records, "exported batch");
    }
    out.flush()?;
    debug!(records = summary.records, batches = summary.batches, "utxo export complete");
    Ok(summary)
}

/// Write the summed amount held by each address, sorted by address.
///
/// Returns the number of distinct addresses written.
pub fn export_address_balances<W, I>(writer: W, records: I, prefix: Prefix) -> Result<u64, StoreError>
where
    W: io::Write,
    I: IntoIterator<Item = Result<IndexedUtxo, StoreError>>,
{
    let mut balances: BTreeMap<String, u64> = BTreeMap::new();
    for record in records {
        let record = record?;
        let address = render_address(&record, prefix)?;
        let balance = balances.entry(address.clone()).or_insert(0);
        *balance = balance
            .checked_add(record.amount)
            .ok_or(StoreError::BalanceOverflow(address))?;
    }

    let mut out = csv::Writer::from_writer(writer);
    out.write_record(["address", "amount"])?;
    for (address, amount) in &balances {
        out.write_record([address.as_str(), amount.to_string().as_str()])?;
    }
    out.flush()?;
    info!(addresses = balances.len(), "exported address balances");
    Ok(balances.len() as u64)
}
