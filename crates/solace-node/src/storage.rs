//! RocksDB-backed persistent account storage.
//!
//! Implements [`AccountStore`] using column families for wallets, recovery
//! attempts, balances, and metadata. Every [`commit`](AccountStore::commit) becomes one
//! atomic [`WriteBatch`], so a crash never leaves a wallet and its attempt
//! out of step.

use std::path::Path;

use rocksdb::{ColumnFamilyDescriptor, DB, Options, WriteBatch};

use solace_core::account::WalletAccount;
use solace_core::attempt::RecoveryAttempt;
use solace_core::error::SolaceError;
use solace_core::store::{AccountStore, StateChange};
use solace_core::types::Address;

// --- Column family names ---

const CF_WALLETS: &str = "wallets";
const CF_ATTEMPTS: &str = "attempts";
const CF_BALANCES: &str = "balances";
const CF_METADATA: &str = "metadata";

const ALL_CFS: &[&str] = &[CF_WALLETS, CF_ATTEMPTS, CF_BALANCES, CF_METADATA];

// --- Metadata keys ---

const META_COMMIT_COUNT: &[u8] = b"commit_count";

/// RocksDB-backed persistent account storage.
///
/// Records are keyed by their 32-byte address and stored bincode-encoded.
/// Balances are stored as little-endian `u64`.
pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    /// Open or create a RocksDB database at the given path.
    ///
    /// Creates all column families if they don't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SolaceError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&db_opts, path.as_ref(), cf_descriptors)
            .map_err(|e| SolaceError::Storage(e.to_string()))?;

        Ok(Self { db })
    }

    /// Number of batches committed over the lifetime of this database.
    pub fn commit_count(&self) -> Result<u64, SolaceError> {
        self.get_meta_u64(META_COMMIT_COUNT)
    }

    /// Number of wallet records. Walks the whole column family.
    pub fn wallet_count(&self) -> Result<usize, SolaceError> {
        let cf = self.cf_handle(CF_WALLETS)?;
        let mut count = 0;
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            item.map_err(|e| SolaceError::Storage(e.to_string()))?;
            count += 1;
        }
        Ok(count)
    }

    // --- Internal helpers ---

    fn get_meta_u64(&self, key: &[u8]) -> Result<u64, SolaceError> {
        self.get_u64(CF_METADATA, key)
    }

    fn get_u64(&self, cf_name: &str, key: &[u8]) -> Result<u64, SolaceError> {
        let cf = self.cf_handle(cf_name)?;
        match self
            .db
            .get_cf(cf, key)
            .map_err(|e| SolaceError::Storage(e.to_string()))?
        {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| SolaceError::Storage("invalid u64 value length".into()))?;
                Ok(u64::from_le_bytes(arr))
            }
            None => Ok(0),
        }
    }

    fn cf_handle(&self, name: &str) -> Result<&rocksdb::ColumnFamily, SolaceError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| SolaceError::Storage(format!("missing column family: {name}")))
    }

    fn get_record<T: bincode::Decode<()>>(
        &self,
        cf_name: &str,
        key: &Address,
    ) -> Result<Option<T>, SolaceError> {
        let cf = self.cf_handle(cf_name)?;
        match self
            .db
            .get_cf(cf, key.as_bytes())
            .map_err(|e| SolaceError::Storage(e.to_string()))?
        {
            Some(data) => {
                let (record, _): (T, usize) =
                    bincode::decode_from_slice(&data, bincode::config::standard())
                        .map_err(|e| SolaceError::Storage(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}

fn encode<T: bincode::Encode>(value: &T) -> Result<Vec<u8>, SolaceError> {
    bincode::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| SolaceError::Storage(e.to_string()))
}

impl AccountStore for RocksStore {
    fn get_wallet(&self, address: &Address) -> Result<Option<WalletAccount>, SolaceError> {
        self.get_record(CF_WALLETS, address)
    }

    fn get_attempt(&self, address: &Address) -> Result<Option<RecoveryAttempt>, SolaceError> {
        self.get_record(CF_ATTEMPTS, address)
    }

    fn get_balance(&self, account: &Address) -> Result<u64, SolaceError> {
        self.get_u64(CF_BALANCES, account.as_bytes())
    }

    fn wallets(&self) -> Result<Vec<WalletAccount>, SolaceError> {
        let cf = self.cf_handle(CF_WALLETS)?;
        let mut wallets = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_, data) = item.map_err(|e| SolaceError::Storage(e.to_string()))?;
            let (wallet, _): (WalletAccount, usize) =
                bincode::decode_from_slice(&data, bincode::config::standard())
                    .map_err(|e| SolaceError::Storage(e.to_string()))?;
            wallets.push(wallet);
        }
        Ok(wallets)
    }

    fn commit(&mut self, changes: Vec<StateChange>) -> Result<(), SolaceError> {
        let cf_wallets = self.cf_handle(CF_WALLETS)?;
        let cf_attempts = self.cf_handle(CF_ATTEMPTS)?;
        let cf_balances = self.cf_handle(CF_BALANCES)?;
        let cf_meta = self.cf_handle(CF_METADATA)?;

        // Nothing reaches the database until the batch is complete.
        let mut batch = WriteBatch::default();
        for change in &changes {
            match change {
                StateChange::PutWallet(wallet) => {
                    batch.put_cf(cf_wallets, wallet.address().as_bytes(), encode(wallet)?);
                }
                StateChange::PutAttempt(attempt) => {
                    batch.put_cf(cf_attempts, attempt.address().as_bytes(), encode(attempt)?);
                }
                StateChange::DeleteAttempt(address) => {
                    batch.delete_cf(cf_attempts, address.as_bytes());
                }
                StateChange::PutBalance { account, lamports } => {
                    batch.put_cf(cf_balances, account.as_bytes(), lamports.to_le_bytes());
                }
            }
        }
        let commits = self.get_meta_u64(META_COMMIT_COUNT)? + 1;
        batch.put_cf(cf_meta, META_COMMIT_COUNT, commits.to_le_bytes());

        self.db
            .write(batch)
            .map_err(|e| SolaceError::Storage(e.to_string()))
    }
}
