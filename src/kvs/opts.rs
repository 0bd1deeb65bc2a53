//! Option sets passed through to the storage engine.
//!
//! Each structure is a plain cloneable value which is converted into the
//! engine's native options only when a call is made. Defaults are read from
//! the environment once, see the `cnf` module.

use rocksdb::{BlockBasedOptions, Cache, LogLevel};

use super::cmp::Comparator;
use super::{LockType, cnf};
use crate::err::{Error, Result};

const TARGET: &str = "rocksbridge::kvs::opts";

/// Options used when opening a datastore or creating a partition
#[derive(Clone, Debug)]
pub struct DbOptions {
	create_if_missing: bool,
	create_missing_partitions: bool,
	paranoid_checks: Option<bool>,
	bulk_load: bool,
	parallelism: i32,
	background_jobs: i32,
	max_open_files: i32,
	keep_log_file_num: usize,
	write_buffer_size: usize,
	block_size: usize,
	block_cache_size: usize,
	level_compaction_budget: Option<usize>,
	log_level: String,
	comparator: Option<Comparator>,
	txn_db: TransactionDbOptions,
}

impl Default for DbOptions {
	fn default() -> Self {
		Self {
			create_if_missing: true,
			create_missing_partitions: true,
			paranoid_checks: None,
			bulk_load: false,
			parallelism: *cnf::THREAD_COUNT,
			background_jobs: *cnf::JOBS_COUNT,
			max_open_files: *cnf::MAX_OPEN_FILES,
			keep_log_file_num: *cnf::KEEP_LOG_FILE_NUM,
			write_buffer_size: *cnf::WRITE_BUFFER_SIZE,
			block_size: *cnf::BLOCK_SIZE,
			block_cache_size: *cnf::BLOCK_CACHE_SIZE,
			level_compaction_budget: None,
			log_level: cnf::STORAGE_LOG_LEVEL.clone(),
			comparator: None,
			txn_db: TransactionDbOptions::default(),
		}
	}
}

impl DbOptions {
	pub fn with_create_if_missing(mut self, create: bool) -> Self {
		self.create_if_missing = create;
		self
	}

	pub fn with_create_missing_partitions(mut self, create: bool) -> Self {
		self.create_missing_partitions = create;
		self
	}

	/// Check every file for corruption aggressively
	pub fn with_paranoid_checks(mut self, paranoid: bool) -> Self {
		self.paranoid_checks = Some(paranoid);
		self
	}

	/// Tune the engine for a one-off bulk load
	pub fn with_bulk_load(mut self, bulk: bool) -> Self {
		self.bulk_load = bulk;
		self
	}

	pub fn with_parallelism(mut self, threads: i32) -> Self {
		self.parallelism = threads;
		self
	}

	pub fn with_background_jobs(mut self, jobs: i32) -> Self {
		self.background_jobs = jobs;
		self
	}

	pub fn with_max_open_files(mut self, files: i32) -> Self {
		self.max_open_files = files;
		self
	}

	pub fn with_write_buffer_size(mut self, size: usize) -> Self {
		self.write_buffer_size = size;
		self
	}

	pub fn with_block_cache_size(mut self, size: usize) -> Self {
		self.block_cache_size = size;
		self
	}

	/// Use level-style compaction with the given memtable memory budget
	pub fn with_level_compaction(mut self, memtable_budget: usize) -> Self {
		self.level_compaction_budget = Some(memtable_budget);
		self
	}

	/// One of `debug`, `info`, `warn`, `error`, `fatal` or `header`
	pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
		self.log_level = level.into();
		self
	}

	pub fn with_comparator(mut self, comparator: Comparator) -> Self {
		self.comparator = Some(comparator);
		self
	}

	pub fn with_transaction_db(mut self, txn_db: TransactionDbOptions) -> Self {
		self.txn_db = txn_db;
		self
	}

	pub fn comparator(&self) -> Option<&Comparator> {
		self.comparator.as_ref()
	}

	pub(crate) fn txn_db(&self) -> &TransactionDbOptions {
		&self.txn_db
	}

	/// Log the options which will be applied at open
	pub(crate) fn log(&self, lock: LockType) {
		info!(target: TARGET, "Transaction mode: {lock:?}");
		info!(target: TARGET, "Background thread count: {}", self.parallelism);
		info!(target: TARGET, "Maximum background jobs count: {}", self.background_jobs);
		info!(target: TARGET, "Maximum number of open files: {}", self.max_open_files);
		info!(target: TARGET, "Number of log files to keep: {}", self.keep_log_file_num);
		info!(target: TARGET, "Write buffer size: {}", self.write_buffer_size);
		info!(target: TARGET, "Block size: {}", self.block_size);
		info!(target: TARGET, "Block cache size: {}", self.block_cache_size);
		info!(target: TARGET, "Storage engine log level: {}", self.log_level);
		if let Some(cmp) = &self.comparator {
			info!(target: TARGET, "Key comparator: {}", cmp.name());
		}
		if lock == LockType::Pessimistic {
			info!(target: TARGET, "Default lock timeout: {}ms", self.txn_db.default_lock_timeout);
		}
	}

	/// Build the block cache shared by every partition of one datastore
	pub(crate) fn cache(&self) -> Cache {
		Cache::new_lru_cache(self.block_cache_size)
	}

	/// Build a fresh set of native options.
	///
	/// The engine consumes one set per partition descriptor, so this is
	/// called once for each partition.
	pub(crate) fn to_native(&self, cache: &Cache) -> Result<rocksdb::Options> {
		let mut opts = rocksdb::Options::default();
		opts.create_if_missing(self.create_if_missing);
		opts.create_missing_column_families(self.create_missing_partitions);
		if let Some(paranoid) = self.paranoid_checks {
			opts.set_paranoid_checks(paranoid);
		}
		if self.bulk_load {
			opts.prepare_for_bulk_load();
		}
		opts.increase_parallelism(self.parallelism);
		opts.set_max_background_jobs(self.background_jobs);
		opts.set_max_open_files(self.max_open_files);
		opts.set_keep_log_file_num(self.keep_log_file_num);
		if let Some(budget) = self.level_compaction_budget {
			opts.optimize_level_style_compaction(budget);
		}
		opts.set_write_buffer_size(self.write_buffer_size);
		// Configure the block based file options
		let mut block_opts = BlockBasedOptions::default();
		block_opts.set_block_size(self.block_size);
		block_opts.set_block_cache(cache);
		opts.set_block_based_table_factory(&block_opts);
		opts.set_log_level(parse_log_level(&self.log_level)?);
		if let Some(cmp) = &self.comparator {
			cmp.apply(&mut opts);
		}
		Ok(opts)
	}
}

fn parse_log_level(level: &str) -> Result<LogLevel> {
	match level.to_ascii_lowercase().as_str() {
		"debug" => Ok(LogLevel::Debug),
		"info" => Ok(LogLevel::Info),
		"warn" => Ok(LogLevel::Warn),
		"error" => Ok(LogLevel::Error),
		"fatal" => Ok(LogLevel::Fatal),
		"header" => Ok(LogLevel::Header),
		l => Err(Error::InvalidOption(format!("Invalid storage engine log level specified: {l}"))),
	}
}

/// Lock manager options for a pessimistic datastore
#[derive(Clone, Debug)]
pub struct TransactionDbOptions {
	default_lock_timeout: i64,
	txn_lock_timeout: i64,
	max_num_locks: Option<i64>,
	num_stripes: Option<usize>,
}

impl Default for TransactionDbOptions {
	fn default() -> Self {
		Self {
			default_lock_timeout: *cnf::LOCK_TIMEOUT,
			txn_lock_timeout: *cnf::LOCK_TIMEOUT,
			max_num_locks: None,
			num_stripes: None,
		}
	}
}

impl TransactionDbOptions {
	/// Lock wait timeout in milliseconds for writes outside a transaction
	pub fn with_default_lock_timeout(mut self, millis: i64) -> Self {
		self.default_lock_timeout = millis;
		self
	}

	/// Lock wait timeout in milliseconds for transactions which set none
	pub fn with_txn_lock_timeout(mut self, millis: i64) -> Self {
		self.txn_lock_timeout = millis;
		self
	}

	pub fn with_max_num_locks(mut self, locks: i64) -> Self {
		self.max_num_locks = Some(locks);
		self
	}

	pub fn with_num_stripes(mut self, stripes: usize) -> Self {
		self.num_stripes = Some(stripes);
		self
	}

	pub(crate) fn to_native(&self) -> rocksdb::TransactionDBOptions {
		let mut opts = rocksdb::TransactionDBOptions::default();
		opts.set_default_lock_timeout(self.default_lock_timeout);
		opts.set_txn_lock_timeout(self.txn_lock_timeout);
		if let Some(locks) = self.max_num_locks {
			opts.set_max_num_locks(locks);
		}
		if let Some(stripes) = self.num_stripes {
			opts.set_num_stripes(stripes);
		}
		opts
	}
}

/// Options applied to reads and iterators
#[derive(Clone, Debug, Default)]
pub struct ReadOpts {
	verify_checksums: Option<bool>,
	total_order_seek: bool,
	fill_cache: Option<bool>,
	async_io: bool,
	lower_bound: Option<Vec<u8>>,
	upper_bound: Option<Vec<u8>>,
	prefix_same_as_start: bool,
}

impl ReadOpts {
	pub fn with_verify_checksums(mut self, verify: bool) -> Self {
		self.verify_checksums = Some(verify);
		self
	}

	pub fn with_total_order_seek(mut self, total: bool) -> Self {
		self.total_order_seek = total;
		self
	}

	pub fn with_fill_cache(mut self, fill: bool) -> Self {
		self.fill_cache = Some(fill);
		self
	}

	pub fn with_async_io(mut self, async_io: bool) -> Self {
		self.async_io = async_io;
		self
	}

	/// Inclusive lower bound for iterators
	pub fn with_lower_bound(mut self, key: impl Into<Vec<u8>>) -> Self {
		self.lower_bound = Some(key.into());
		self
	}

	/// Exclusive upper bound for iterators
	pub fn with_upper_bound(mut self, key: impl Into<Vec<u8>>) -> Self {
		self.upper_bound = Some(key.into());
		self
	}

	pub fn with_prefix_same_as_start(mut self, prefix: bool) -> Self {
		self.prefix_same_as_start = prefix;
		self
	}

	/// Build a fresh set of native options, without any snapshot
	pub(crate) fn to_native(&self) -> rocksdb::ReadOptions {
		let mut opts = rocksdb::ReadOptions::default();
		if let Some(verify) = self.verify_checksums {
			opts.set_verify_checksums(verify);
		}
		if let Some(fill) = self.fill_cache {
			opts.fill_cache(fill);
		}
		if self.total_order_seek {
			opts.set_total_order_seek(true);
		}
		if self.async_io {
			opts.set_async_io(true);
		}
		if let Some(key) = &self.lower_bound {
			opts.set_iterate_lower_bound(key.clone());
		}
		if let Some(key) = &self.upper_bound {
			opts.set_iterate_upper_bound(key.clone());
		}
		if self.prefix_same_as_start {
			opts.set_prefix_same_as_start(true);
		}
		opts
	}
}

/// Options applied to writes
#[derive(Clone, Debug)]
pub struct WriteOpts {
	sync: bool,
	disable_wal: bool,
}

impl Default for WriteOpts {
	fn default() -> Self {
		Self {
			sync: *cnf::SYNC_DATA,
			disable_wal: false,
		}
	}
}

impl WriteOpts {
	/// Wait for the write-ahead log to reach the disk before returning
	pub fn with_sync(mut self, sync: bool) -> Self {
		self.sync = sync;
		self
	}

	pub fn with_disable_wal(mut self, disable: bool) -> Self {
		self.disable_wal = disable;
		self
	}

	pub(crate) fn to_native(&self) -> rocksdb::WriteOptions {
		let mut opts = rocksdb::WriteOptions::default();
		opts.set_sync(self.sync);
		opts.disable_wal(self.disable_wal);
		opts
	}
}

/// Options applied to memtable flushes
#[derive(Clone, Debug)]
pub struct FlushOpts {
	wait: bool,
}

impl Default for FlushOpts {
	fn default() -> Self {
		Self {
			wait: true,
		}
	}
}

impl FlushOpts {
	/// Block until the flush has completed
	pub fn with_wait(mut self, wait: bool) -> Self {
		self.wait = wait;
		self
	}

	pub(crate) fn to_native(&self) -> rocksdb::FlushOptions {
		let mut opts = rocksdb::FlushOptions::default();
		opts.set_wait(self.wait);
		opts
	}
}

/// Per-transaction options for a pessimistic datastore
#[derive(Clone, Debug)]
pub struct PessimisticOptions {
	snapshot: bool,
	deadlock_detect: bool,
	deadlock_detect_depth: Option<i64>,
	lock_timeout: Option<i64>,
	expiration: Option<i64>,
}

impl Default for PessimisticOptions {
	fn default() -> Self {
		Self {
			snapshot: false,
			deadlock_detect: *cnf::DEADLOCK_DETECT,
			deadlock_detect_depth: None,
			lock_timeout: None,
			expiration: None,
		}
	}
}

impl PessimisticOptions {
	/// Bind reads to a snapshot taken when the transaction begins
	pub fn with_snapshot(mut self, snapshot: bool) -> Self {
		self.snapshot = snapshot;
		self
	}

	pub fn with_deadlock_detect(mut self, detect: bool) -> Self {
		self.deadlock_detect = detect;
		self
	}

	pub fn with_deadlock_detect_depth(mut self, depth: i64) -> Self {
		self.deadlock_detect_depth = Some(depth);
		self
	}

	/// Lock wait timeout in milliseconds, overriding the datastore default
	pub fn with_lock_timeout(mut self, millis: i64) -> Self {
		self.lock_timeout = Some(millis);
		self
	}

	/// Time in milliseconds after which the transaction can be expired
	pub fn with_expiration(mut self, millis: i64) -> Self {
		self.expiration = Some(millis);
		self
	}

	pub(crate) fn to_native(&self) -> rocksdb::TransactionOptions {
		let mut opts = rocksdb::TransactionOptions::default();
		opts.set_snapshot(self.snapshot);
		opts.set_deadlock_detect(self.deadlock_detect);
		if let Some(depth) = self.deadlock_detect_depth {
			opts.set_deadlock_detect_depth(depth);
		}
		if let Some(millis) = self.lock_timeout {
			opts.set_lock_timeout(millis);
		}
		if let Some(millis) = self.expiration {
			opts.set_expiration(millis);
		}
		opts
	}
}

/// Per-transaction options for an optimistic datastore
#[derive(Clone, Debug, Default)]
pub struct OptimisticOptions {
	snapshot: bool,
}

impl OptimisticOptions {
	/// Bind reads and conflict validation to a snapshot taken at begin
	pub fn with_snapshot(mut self, snapshot: bool) -> Self {
		self.snapshot = snapshot;
		self
	}

	pub(crate) fn to_native(&self) -> rocksdb::OptimisticTransactionOptions {
		let mut opts = rocksdb::OptimisticTransactionOptions::default();
		opts.set_snapshot(self.snapshot);
		opts
	}
}

/// Transaction options, tagged with the mode they apply to
#[derive(Clone, Debug)]
pub enum TransactionOptions {
	Pessimistic(PessimisticOptions),
	Optimistic(OptimisticOptions),
}

impl TransactionOptions {
	pub fn lock_type(&self) -> LockType {
		match self {
			TransactionOptions::Pessimistic(_) => LockType::Pessimistic,
			TransactionOptions::Optimistic(_) => LockType::Optimistic,
		}
	}

	/// Whether the native transaction binds a snapshot at begin
	pub fn snapshot(&self) -> bool {
		match self {
			TransactionOptions::Pessimistic(o) => o.snapshot,
			TransactionOptions::Optimistic(o) => o.snapshot,
		}
	}
}

/// Everything a transaction is created with.
///
/// The transaction keeps its own copy for its whole life, so the same
/// configuration can be reused for any number of transactions.
#[derive(Clone, Debug)]
pub struct TransactionConfig {
	/// Options for transactional reads and iterators
	pub read: ReadOpts,
	/// Options for transactional writes and commit
	pub write: WriteOpts,
	/// Options for raw reads and iterators
	pub raw_read: ReadOpts,
	/// Options for raw writes
	pub raw_write: WriteOpts,
	/// Options for raw flushes
	pub flush: FlushOpts,
	pub txn: TransactionOptions,
}

impl TransactionConfig {
	pub fn pessimistic(txn: PessimisticOptions) -> Self {
		Self::new(TransactionOptions::Pessimistic(txn))
	}

	pub fn optimistic(txn: OptimisticOptions) -> Self {
		Self::new(TransactionOptions::Optimistic(txn))
	}

	fn new(txn: TransactionOptions) -> Self {
		Self {
			read: ReadOpts::default(),
			write: WriteOpts::default(),
			raw_read: ReadOpts::default(),
			raw_write: WriteOpts::default(),
			flush: FlushOpts::default(),
			txn,
		}
	}

	/// The default configuration for a datastore mode
	pub fn for_lock(lock: LockType) -> Self {
		match lock {
			LockType::Pessimistic => Self::pessimistic(PessimisticOptions::default()),
			LockType::Optimistic => Self::optimistic(OptimisticOptions::default()),
		}
	}
}
