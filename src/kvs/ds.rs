use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rocksdb::{
	BoundColumnFamily, Cache, ColumnFamilyDescriptor, DB, Options, ReadOptions,
	WriteBatchWithTransaction, WriteOptions,
};

use super::debug::Sprintable;
use super::iter::{self, Cursor, OptimisticDb, PessimisticDb};
use super::opts::{DbOptions, FlushOpts, ReadOpts, TransactionConfig, TransactionOptions, WriteOpts};
use super::partition::{DEFAULT_PARTITION, Partition, PartitionHandle, Registry};
use super::tx::{self, Snapshot, Transaction};
use super::{Fetched, Key, LockType, Pinned, Val};
use crate::err::{Error, Result};

const TARGET: &str = "rocksbridge::kvs::ds";

#[allow(clippy::large_enum_variant)]
enum Inner {
	Pessimistic(PessimisticDb),
	Optimistic(OptimisticDb),
}

/// An open storage engine session.
///
/// The transaction mode is chosen when the datastore is opened, and every
/// transaction begun on it uses that mode. Transactions and cursors borrow
/// the datastore, so it always outlives them.
pub struct Datastore {
	inner: Inner,
	registry: Registry,
	opts: DbOptions,
	cache: Cache,
	path: PathBuf,
}

impl fmt::Debug for Datastore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Datastore")
			.field("lock", &self.lock_type())
			.field("path", &self.path)
			.field("registry", &self.registry)
			.finish()
	}
}

impl Datastore {
	/// Open a datastore at a path, with every partition stored there.
	///
	/// A missing database is created with only the default partition, unless
	/// the options say otherwise.
	pub fn open<P: AsRef<Path>>(lock: LockType, opts: &DbOptions, path: P) -> Result<Datastore> {
		let path = path.as_ref().to_path_buf();
		debug!(target: TARGET, path = %path.display(), "Opening datastore");
		opts.log(lock);
		let cache = opts.cache();
		// An unreadable list means a new database
		let names = match DB::list_cf(&Options::default(), &path) {
			Ok(names) if !names.is_empty() => names,
			_ => vec![DEFAULT_PARTITION.to_string()],
		};
		info!(target: TARGET, "Opening partitions: {}", names.join(", "));
		let descriptors = names
			.iter()
			.map(|name| opts.to_native(&cache).map(|o| ColumnFamilyDescriptor::new(name, o)))
			.collect::<Result<Vec<_>>>()?;
		let db_opts = opts.to_native(&cache)?;
		let inner = match lock {
			LockType::Pessimistic => {
				let txn_db_opts = opts.txn_db().to_native();
				Inner::Pessimistic(PessimisticDb::open_cf_descriptors(
					&db_opts,
					&txn_db_opts,
					&path,
					descriptors,
				)?)
			}
			LockType::Optimistic => {
				Inner::Optimistic(OptimisticDb::open_cf_descriptors(&db_opts, &path, descriptors)?)
			}
		};
		Ok(Datastore {
			inner,
			registry: Registry::new(names),
			opts: opts.clone(),
			cache,
			path,
		})
	}

	/// The concurrency control strategy chosen at open
	pub fn lock_type(&self) -> LockType {
		match self.inner {
			Inner::Pessimistic(_) => LockType::Pessimistic,
			Inner::Optimistic(_) => LockType::Optimistic,
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Start a new transaction.
	///
	/// Returns `None` if the transaction options are for the other mode.
	pub fn begin_transaction(&self, cfg: TransactionConfig) -> Option<Transaction<'_>> {
		let wo = cfg.write.to_native();
		let inner = match (&self.inner, &cfg.txn) {
			(Inner::Pessimistic(db), TransactionOptions::Pessimistic(o)) => {
				tx::Inner::Pessimistic(db.transaction_opt(&wo, &o.to_native()))
			}
			(Inner::Optimistic(db), TransactionOptions::Optimistic(o)) => {
				tx::Inner::Optimistic(db.transaction_opt(&wo, &o.to_native()))
			}
			_ => {
				warn!(target: TARGET, "Transaction options do not match the {:?} datastore", self.lock_type());
				return None;
			}
		};
		trace!(target: TARGET, "Beginning transaction");
		Some(Transaction::new(self, inner, cfg))
	}

	/// Look up a partition by name
	pub fn partition(&self, name: &str) -> Option<PartitionHandle> {
		self.registry.get(name)
	}

	/// The default partition, which always exists
	pub fn default_partition(&self) -> Result<PartitionHandle> {
		self.registry.default_partition()
	}

	/// The names of every partition, in no particular order
	pub fn partition_names(&self) -> Vec<String> {
		self.registry.names()
	}

	/// Create a new, empty partition
	pub fn create_partition(&self, opts: &DbOptions, name: &str) -> Result<PartitionHandle> {
		self.registry.create(name, || {
			let opts = opts.to_native(&self.cache)?;
			match &self.inner {
				Inner::Pessimistic(db) => db.create_cf(name, &opts)?,
				Inner::Optimistic(db) => db.create_cf(name, &opts)?,
			}
			Ok(())
		})
	}

	/// Drop a partition and all of its data.
	///
	/// Every handle to the partition stops working, including handles
	/// still held by callers.
	pub fn drop_partition(&self, name: &str) -> Result<()> {
		self.registry.remove(name, || {
			match &self.inner {
				Inner::Pessimistic(db) => db.drop_cf(name)?,
				Inner::Optimistic(db) => db.drop_cf(name)?,
			}
			Ok(())
		})
	}

	/// Resolve a partition to the engine's handle for the duration of a call
	pub(crate) fn bind(&self, p: &Partition) -> Result<Arc<BoundColumnFamily<'_>>> {
		ensure!(!p.is_dropped(), Error::PartitionNotFound(p.name().to_owned()));
		let cf = match &self.inner {
			Inner::Pessimistic(db) => db.cf_handle(p.name()),
			Inner::Optimistic(db) => db.cf_handle(p.name()),
		};
		// A partition re-created under the same name is a different partition
		match cf {
			Some(cf) if !p.is_dropped() => Ok(cf),
			_ => Err(Error::PartitionNotFound(p.name().to_owned())),
		}
	}

	/// Take a snapshot of the whole datastore
	pub(crate) fn snapshot(&self) -> Snapshot<'_> {
		match &self.inner {
			Inner::Pessimistic(db) => Snapshot::Pessimistic(db.snapshot()),
			Inner::Optimistic(db) => Snapshot::Optimistic(db.snapshot()),
		}
	}

	/// Fetch a key, outside of any transaction
	#[instrument(level = "trace", target = "rocksbridge::kvs::ds", skip(self, opts, p, key), fields(partition = p.name(), key = key.sprint()))]
	pub fn get<K: AsRef<[u8]>>(
		&self,
		opts: &ReadOpts,
		p: &Partition,
		key: K,
	) -> Result<Option<Pinned<'_>>> {
		let cf = self.bind(p)?;
		let ro = opts.to_native();
		let res = match &self.inner {
			Inner::Pessimistic(db) => db.get_pinned_cf_opt(&cf, key, &ro)?,
			Inner::Optimistic(db) => db.get_pinned_cf_opt(&cf, key, &ro)?,
		};
		Ok(res)
	}

	/// Fetch many keys of one partition, outside of any transaction.
	///
	/// The keys are read in one engine call and the results are in the same
	/// order as the keys.
	#[instrument(level = "trace", target = "rocksbridge::kvs::ds", skip_all, fields(partition = p.name()))]
	pub fn multiget<I, K>(
		&self,
		opts: &ReadOpts,
		p: &Partition,
		keys: I,
	) -> Result<Vec<Result<Option<Fetched<'_>>>>>
	where
		I: IntoIterator<Item = K>,
		K: AsRef<[u8]>,
	{
		let cf = self.bind(p)?;
		let ro = opts.to_native();
		let res = match &self.inner {
			Inner::Pessimistic(db) => db
				.multi_get_cf_opt(keys.into_iter().map(|key| (&cf, key)), &ro)
				.into_iter()
				.map(|res| res.map(|v| v.map(Fetched::Owned)).map_err(Error::from))
				.collect(),
			Inner::Optimistic(db) => {
				let keys: Vec<K> = keys.into_iter().collect();
				db.batched_multi_get_cf_opt(&cf, keys.iter(), false, &ro)
					.into_iter()
					.map(|res| res.map(|v| v.map(Fetched::Pinned)).map_err(Error::from))
					.collect()
			}
		};
		Ok(res)
	}

	/// Write a key, outside of any transaction
	#[instrument(level = "trace", target = "rocksbridge::kvs::ds", skip(self, opts, p, key, val), fields(partition = p.name(), key = key.sprint()))]
	pub fn put<K, V>(&self, opts: &WriteOpts, p: &Partition, key: K, val: V) -> Result<()>
	where
		K: AsRef<[u8]>,
		V: AsRef<[u8]>,
	{
		let cf = self.bind(p)?;
		let wo = opts.to_native();
		match &self.inner {
			Inner::Pessimistic(db) => db.put_cf_opt(&cf, key, val, &wo)?,
			Inner::Optimistic(db) => db.put_cf_opt(&cf, key, val, &wo)?,
		}
		Ok(())
	}

	/// Delete a key, outside of any transaction
	#[instrument(level = "trace", target = "rocksbridge::kvs::ds", skip(self, opts, p, key), fields(partition = p.name(), key = key.sprint()))]
	pub fn delete<K: AsRef<[u8]>>(&self, opts: &WriteOpts, p: &Partition, key: K) -> Result<()> {
		let cf = self.bind(p)?;
		let wo = opts.to_native();
		match &self.inner {
			Inner::Pessimistic(db) => db.delete_cf_opt(&cf, key, &wo)?,
			Inner::Optimistic(db) => db.delete_cf_opt(&cf, key, &wo)?,
		}
		Ok(())
	}

	/// Delete every key from `rng.start` up to, but excluding, `rng.end`.
	///
	/// A pessimistic datastore cannot delete a range natively, so the keys
	/// are collected first and deleted in a single batch.
	#[instrument(level = "trace", target = "rocksbridge::kvs::ds", skip_all, fields(partition = p.name(), start = rng.start.sprint(), end = rng.end.sprint()))]
	pub fn delete_range<K: AsRef<[u8]>>(
		&self,
		opts: &WriteOpts,
		p: &Partition,
		rng: Range<K>,
	) -> Result<()> {
		let cf = self.bind(p)?;
		let wo = opts.to_native();
		match &self.inner {
			Inner::Pessimistic(db) => {
				let mut ro = ReadOpts::default().to_native();
				iter::bound(&mut ro, rng);
				let mut it = db.raw_iterator_cf_opt(&cf, ro);
				let mut batch = WriteBatchWithTransaction::<true>::default();
				it.seek_to_first();
				while let Some(key) = it.key() {
					batch.delete_cf(&cf, key);
					it.next();
				}
				it.status()?;
				trace!(target: TARGET, count = batch.len(), "Deleting range in a batch");
				db.write_opt(batch, &wo)?;
			}
			Inner::Optimistic(db) => {
				db.delete_range_cf_opt(&cf, rng.start.as_ref(), rng.end.as_ref(), &wo)?
			}
		}
		Ok(())
	}

	/// Make the writes of a partition durable.
	///
	/// An optimistic datastore flushes the partition memtable to disk. A
	/// pessimistic transaction database has no memtable flush of its own, so
	/// there the write-ahead log is synced instead, and the memtables are
	/// flushed when the datastore is closed.
	#[instrument(level = "trace", target = "rocksbridge::kvs::ds", skip_all, fields(partition = p.name()))]
	pub fn flush(&self, opts: &FlushOpts, p: &Partition) -> Result<()> {
		let cf = self.bind(p)?;
		match &self.inner {
			Inner::Pessimistic(db) => {
				let mut wo = WriteOptions::default();
				wo.set_sync(true);
				db.write_opt(WriteBatchWithTransaction::<true>::default(), &wo)?
			}
			Inner::Optimistic(db) => db.flush_cf_opt(&cf, &opts.to_native())?,
		}
		Ok(())
	}

	/// Open a cursor over a partition, outside of any transaction
	pub fn iterator(&self, opts: &ReadOpts, p: &Partition) -> Result<Cursor<'_>> {
		self.cursor(p, opts.to_native())
	}

	/// Retrieve a range of keys in ascending order, outside of any transaction
	pub fn scan<K: AsRef<[u8]>>(
		&self,
		opts: &ReadOpts,
		p: &Partition,
		rng: Range<K>,
		limit: Option<usize>,
	) -> Result<Vec<(Key, Val)>> {
		let mut ro = opts.to_native();
		iter::bound(&mut ro, rng);
		self.cursor(p, ro)?.collect_range(false, limit)
	}

	/// Retrieve a range of keys in descending order, outside of any transaction
	pub fn scanr<K: AsRef<[u8]>>(
		&self,
		opts: &ReadOpts,
		p: &Partition,
		rng: Range<K>,
		limit: Option<usize>,
	) -> Result<Vec<(Key, Val)>> {
		let mut ro = opts.to_native();
		iter::bound(&mut ro, rng);
		self.cursor(p, ro)?.collect_range(true, limit)
	}

	fn cursor(&self, p: &Partition, ro: ReadOptions) -> Result<Cursor<'_>> {
		let cf = self.bind(p)?;
		let it = match &self.inner {
			Inner::Pessimistic(db) => iter::Inner::Pessimistic(db.raw_iterator_cf_opt(&cf, ro)),
			Inner::Optimistic(db) => iter::Inner::Optimistic(db.raw_iterator_cf_opt(&cf, ro)),
		};
		Ok(Cursor::new(it))
	}

	/// Flush all pending writes to disk and close the datastore.
	///
	/// A pessimistic database is closed first and then reopened as a plain
	/// database, whose recovery and flush move every memtable to disk.
	pub fn close(self) -> Result<()> {
		let Datastore {
			inner,
			registry,
			opts,
			cache,
			path,
		} = self;
		debug!(target: TARGET, path = %path.display(), "Closing datastore");
		let fo = FlushOpts::default().to_native();
		let res = match inner {
			Inner::Pessimistic(db) => {
				drop(db);
				Self::flush_at_rest(&opts, &cache, &path, registry.names())
			}
			Inner::Optimistic(db) => {
				db.flush_wal(true).and_then(|_| db.flush_opt(&fo)).map_err(Error::from)
			}
		};
		if let Err(e) = &res {
			error!(target: TARGET, "Failed to flush the datastore on close: {e}");
		}
		res
	}

	fn flush_at_rest(opts: &DbOptions, cache: &Cache, path: &Path, names: Vec<String>) -> Result<()> {
		trace!(target: TARGET, path = %path.display(), "Flushing closed datastore");
		let descriptors = names
			.iter()
			.map(|name| opts.to_native(cache).map(|o| ColumnFamilyDescriptor::new(name, o)))
			.collect::<Result<Vec<_>>>()?;
		let db = DB::open_cf_descriptors(&opts.to_native(cache)?, path, descriptors)?;
		db.flush_wal(true)?;
		db.flush_opt(&FlushOpts::default().to_native())?;
		Ok(())
	}
}
