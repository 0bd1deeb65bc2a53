use std::fmt;
use std::ops::Range;

use rocksdb::{ReadOptions, SnapshotWithThreadMode};

use super::debug::Sprintable;
use super::ds::Datastore;
use super::iter::{self, Cursor, OptimisticDb, OptimisticTx, PessimisticDb, PessimisticTx};
use super::opts::TransactionConfig;
use super::partition::Partition;
use super::savepoint::SavePoints;
use super::status::{Status, StatusCode, StatusSeverity, StatusSubCode};
use super::{Fetched, Key, LockType, Pinned, Val};
use crate::err::{Error, Result};

const TARGET: &str = "rocksbridge::kvs::tx";

/// Specifies how an unfinished transaction is reported when dropped
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Check {
	/// Trace the drop only
	#[default]
	None,
	/// Log a warning
	Warn,
	/// Log an error
	Error,
}

#[allow(clippy::large_enum_variant)]
pub(crate) enum Inner<'a> {
	Pessimistic(PessimisticTx<'a>),
	Optimistic(OptimisticTx<'a>),
}

/// A point-in-time view of the whole datastore
pub(crate) enum Snapshot<'a> {
	Pessimistic(SnapshotWithThreadMode<'a, PessimisticDb>),
	Optimistic(SnapshotWithThreadMode<'a, OptimisticDb>),
}

impl Snapshot<'_> {
	fn apply(&self, ro: &mut ReadOptions) {
		match self {
			Snapshot::Pessimistic(s) => ro.set_snapshot(s),
			Snapshot::Optimistic(s) => ro.set_snapshot(s),
		}
	}
}

/// A transaction over a [`Datastore`].
///
/// A transaction is either committed or rolled back exactly once. Any
/// further transactional call returns [`Error::TxFinished`]. Dropping an
/// unfinished transaction rolls it back.
///
/// The `raw_*` methods bypass the transaction entirely and work directly
/// against the datastore, so they remain usable once it has finished.
pub struct Transaction<'a> {
	/// Is the transaction complete?
	done: bool,
	/// Should we check unhandled transactions?
	check: Check,
	/// The underlying datastore transaction
	inner: Option<Inner<'a>>,
	/// The snapshot bound by `set_snapshot`, if any
	snapshot: Option<Snapshot<'a>>,
	/// The savepoints set on the native transaction
	savepoints: SavePoints,
	/// The options this transaction was created with
	cfg: TransactionConfig,
	/// The datastore this transaction belongs to
	ds: &'a Datastore,
}

impl fmt::Debug for Transaction<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Transaction")
			.field("done", &self.done)
			.field("check", &self.check)
			.field("lock", &self.cfg.txn.lock_type())
			.field("snapshot", &self.snapshot.is_some())
			.field("savepoints", &self.savepoints.len())
			.finish()
	}
}

impl Drop for Transaction<'_> {
	fn drop(&mut self) {
		if !self.done {
			match self.check {
				Check::None => {
					trace!(target: TARGET, "A transaction was dropped without being committed or rolled back");
				}
				Check::Warn => {
					warn!(target: TARGET, "A transaction was dropped without being committed or rolled back");
				}
				Check::Error => {
					error!(target: TARGET, "A transaction was dropped without being committed or rolled back");
				}
			}
		}
	}
}

impl<'a> Transaction<'a> {
	pub(crate) fn new(ds: &'a Datastore, inner: Inner<'a>, cfg: TransactionConfig) -> Self {
		Self {
			done: false,
			check: Check::default(),
			inner: Some(inner),
			snapshot: None,
			savepoints: SavePoints::default(),
			cfg,
			ds,
		}
	}

	/// The concurrency control strategy of this transaction
	pub fn lock_type(&self) -> LockType {
		self.cfg.txn.lock_type()
	}

	/// Set how this transaction is reported if dropped while unfinished
	pub fn check_level(&mut self, check: Check) {
		self.check = check;
	}

	/// Check if this transaction has been committed or rolled back
	pub fn closed(&self) -> bool {
		self.done
	}

	fn inner(&self) -> Result<&Inner<'a>> {
		// Check to see if transaction is closed
		ensure!(!self.done, Error::TxFinished);
		match &self.inner {
			Some(inner) => Ok(inner),
			None => fail!("An active transaction has no native transaction"),
		}
	}

	/// Build the read options for a transactional read
	fn read_options(&self, inner: &Inner<'a>) -> ReadOptions {
		match &self.snapshot {
			Some(snapshot) => {
				let mut ro = self.cfg.read.to_native();
				snapshot.apply(&mut ro);
				ro
			}
			None => self.native_read_options(inner),
		}
	}

	/// Build read options which ignore any snapshot bound by `set_snapshot`.
	///
	/// The engine validates locked and tracked keys against the native
	/// transaction snapshot only, so locking reads must use these.
	fn native_read_options(&self, inner: &Inner<'a>) -> ReadOptions {
		let mut ro = self.cfg.read.to_native();
		if self.cfg.txn.snapshot() {
			match inner {
				Inner::Pessimistic(tx) => ro.set_snapshot(&tx.snapshot()),
				Inner::Optimistic(tx) => ro.set_snapshot(&tx.snapshot()),
			}
		}
		ro
	}

	/// Fetch a key through the transaction
	#[instrument(level = "trace", target = "rocksbridge::kvs::tx", skip(self, p, key), fields(partition = p.name(), key = key.sprint()))]
	pub fn get<K: AsRef<[u8]>>(&self, p: &Partition, key: K) -> Result<Option<Pinned<'_>>> {
		let inner = self.inner()?;
		let cf = self.ds.bind(p)?;
		let ro = self.read_options(inner);
		let res = match inner {
			Inner::Pessimistic(tx) => tx.get_pinned_cf_opt(&cf, key, &ro)?,
			Inner::Optimistic(tx) => tx.get_pinned_cf_opt(&cf, key, &ro)?,
		};
		Ok(res)
	}

	/// Fetch a key and mark it for update.
	///
	/// A pessimistic transaction takes an exclusive lock on the key. An
	/// optimistic transaction records the key so that the commit fails if
	/// another writer changed it first.
	///
	/// Once `set_snapshot` has been called, the key is locked or recorded
	/// at its latest state and compared with the snapshot view. A key
	/// changed by another writer since the snapshot fails with a `Busy`
	/// engine status, as a conflicting commit would.
	#[instrument(level = "trace", target = "rocksbridge::kvs::tx", skip(self, p, key), fields(partition = p.name(), key = key.sprint()))]
	pub fn get_for_update<K: AsRef<[u8]>>(
		&self,
		p: &Partition,
		key: K,
	) -> Result<Option<Pinned<'_>>> {
		let inner = self.inner()?;
		let cf = self.ds.bind(p)?;
		let key = key.as_ref();
		let ro = self.native_read_options(inner);
		let res = match inner {
			Inner::Pessimistic(tx) => tx.get_pinned_for_update_cf_opt(&cf, key, true, &ro)?,
			Inner::Optimistic(tx) => tx.get_pinned_for_update_cf_opt(&cf, key, true, &ro)?,
		};
		if self.snapshot.is_some() {
			let ro = self.read_options(inner);
			let seen = match inner {
				Inner::Pessimistic(tx) => tx.get_pinned_cf_opt(&cf, key, &ro)?,
				Inner::Optimistic(tx) => tx.get_pinned_cf_opt(&cf, key, &ro)?,
			};
			if seen.as_deref() != res.as_deref() {
				debug!(target: TARGET, key = %key.sprint(), "Key changed since the transaction snapshot");
				return Err(Error::Engine {
					status: Status::new(StatusCode::Busy, StatusSubCode::None, StatusSeverity::NoError),
					message: "The key was changed after the transaction snapshot was taken".to_owned(),
				});
			}
		}
		Ok(res)
	}

	/// Fetch many keys of one partition through the transaction.
	///
	/// The keys are read in one engine call and the results are in the same
	/// order as the keys. A missing key is `Ok(None)` and a failure on one
	/// key does not affect the others.
	#[instrument(level = "trace", target = "rocksbridge::kvs::tx", skip_all, fields(partition = p.name()))]
	pub fn multiget<I, K>(&self, p: &Partition, keys: I) -> Result<Vec<Result<Option<Fetched<'_>>>>>
	where
		I: IntoIterator<Item = K>,
		K: AsRef<[u8]>,
	{
		let inner = self.inner()?;
		let cf = self.ds.bind(p)?;
		let ro = self.read_options(inner);
		let keys = keys.into_iter().map(|key| (&cf, key));
		let res = match inner {
			Inner::Pessimistic(tx) => tx.multi_get_cf_opt(keys, &ro),
			Inner::Optimistic(tx) => tx.multi_get_cf_opt(keys, &ro),
		};
		Ok(res.into_iter().map(|r| r.map(|v| v.map(Fetched::Owned)).map_err(Error::from)).collect())
	}

	/// Insert or update a key through the transaction
	#[instrument(level = "trace", target = "rocksbridge::kvs::tx", skip(self, p, key, val), fields(partition = p.name(), key = key.sprint()))]
	pub fn put<K, V>(&self, p: &Partition, key: K, val: V) -> Result<()>
	where
		K: AsRef<[u8]>,
		V: AsRef<[u8]>,
	{
		let inner = self.inner()?;
		let cf = self.ds.bind(p)?;
		match inner {
			Inner::Pessimistic(tx) => tx.put_cf(&cf, key, val)?,
			Inner::Optimistic(tx) => tx.put_cf(&cf, key, val)?,
		}
		Ok(())
	}

	/// Delete a key through the transaction
	#[instrument(level = "trace", target = "rocksbridge::kvs::tx", skip(self, p, key), fields(partition = p.name(), key = key.sprint()))]
	pub fn delete<K: AsRef<[u8]>>(&self, p: &Partition, key: K) -> Result<()> {
		let inner = self.inner()?;
		let cf = self.ds.bind(p)?;
		match inner {
			Inner::Pessimistic(tx) => tx.delete_cf(&cf, key)?,
			Inner::Optimistic(tx) => tx.delete_cf(&cf, key)?,
		}
		Ok(())
	}

	/// Open a cursor over the transaction's view of a partition.
	///
	/// The view includes the transaction's own uncommitted writes.
	#[instrument(level = "trace", target = "rocksbridge::kvs::tx", skip_all, fields(partition = p.name()))]
	pub fn iterator(&self, p: &Partition) -> Result<Cursor<'_>> {
		let inner = self.inner()?;
		let ro = self.read_options(inner);
		self.cursor(inner, p, ro)
	}

	fn cursor<'b>(&'b self, inner: &'b Inner<'a>, p: &Partition, ro: ReadOptions) -> Result<Cursor<'b>> {
		let cf = self.ds.bind(p)?;
		let it = match inner {
			Inner::Pessimistic(tx) => iter::Inner::PessimisticTx(tx.raw_iterator_cf_opt(&cf, ro)),
			Inner::Optimistic(tx) => iter::Inner::OptimisticTx(tx.raw_iterator_cf_opt(&cf, ro)),
		};
		Ok(Cursor::new(it))
	}

	/// Retrieve a range of keys, in ascending order, through the transaction
	#[instrument(level = "trace", target = "rocksbridge::kvs::tx", skip_all, fields(partition = p.name(), start = rng.start.sprint(), end = rng.end.sprint()))]
	pub fn scan<K: AsRef<[u8]>>(
		&self,
		p: &Partition,
		rng: Range<K>,
		limit: Option<usize>,
	) -> Result<Vec<(Key, Val)>> {
		let inner = self.inner()?;
		let mut ro = self.read_options(inner);
		iter::bound(&mut ro, rng);
		self.cursor(inner, p, ro)?.collect_range(false, limit)
	}

	/// Retrieve a range of keys, in descending order, through the transaction
	#[instrument(level = "trace", target = "rocksbridge::kvs::tx", skip_all, fields(partition = p.name(), start = rng.start.sprint(), end = rng.end.sprint()))]
	pub fn scanr<K: AsRef<[u8]>>(
		&self,
		p: &Partition,
		rng: Range<K>,
		limit: Option<usize>,
	) -> Result<Vec<(Key, Val)>> {
		let inner = self.inner()?;
		let mut ro = self.read_options(inner);
		iter::bound(&mut ro, rng);
		self.cursor(inner, p, ro)?.collect_range(true, limit)
	}

	/// Bind every later transactional read to the current state of the datastore.
	///
	/// The view stays fixed until the transaction commits. Calling this
	/// again replaces it with a fresh one.
	pub fn set_snapshot(&mut self) -> Result<()> {
		self.inner()?;
		self.snapshot = Some(self.ds.snapshot());
		Ok(())
	}

	/// Commit the transaction, releasing any bound snapshot
	#[instrument(level = "trace", target = "rocksbridge::kvs::tx", skip_all)]
	pub fn commit(&mut self) -> Result<()> {
		// Check to see if transaction is closed
		ensure!(!self.done, Error::TxFinished);
		// Mark this transaction as done
		self.done = true;
		// Release the snapshot and savepoints
		self.snapshot = None;
		self.savepoints.clear();
		// Commit this transaction
		match self.inner.take() {
			Some(Inner::Pessimistic(tx)) => tx.commit()?,
			Some(Inner::Optimistic(tx)) => tx.commit()?,
			None => fail!("An active transaction has no native transaction"),
		}
		Ok(())
	}

	/// Roll back the transaction, discarding every write
	#[instrument(level = "trace", target = "rocksbridge::kvs::tx", skip_all)]
	pub fn rollback(&mut self) -> Result<()> {
		// Check to see if transaction is closed
		ensure!(!self.done, Error::TxFinished);
		// Mark this transaction as done
		self.done = true;
		self.snapshot = None;
		self.savepoints.clear();
		// Rollback this transaction
		match self.inner.take() {
			Some(Inner::Pessimistic(tx)) => tx.rollback()?,
			Some(Inner::Optimistic(tx)) => tx.rollback()?,
			None => fail!("An active transaction has no native transaction"),
		}
		Ok(())
	}

	/// Set a savepoint which later writes can be reverted to
	pub fn set_savepoint(&mut self) -> Result<()> {
		match self.inner()? {
			Inner::Pessimistic(tx) => tx.set_savepoint(),
			Inner::Optimistic(tx) => tx.set_savepoint(),
		}
		self.savepoints.push();
		Ok(())
	}

	/// Revert every write made since the latest savepoint and remove it
	pub fn rollback_to_savepoint(&mut self) -> Result<()> {
		self.inner()?;
		let count = self.savepoints.depth()?;
		trace!(target: TARGET, count, "Rolling back to savepoint");
		for _ in 0..count {
			match &self.inner {
				Some(Inner::Pessimistic(tx)) => tx.rollback_to_savepoint()?,
				Some(Inner::Optimistic(tx)) => tx.rollback_to_savepoint()?,
				None => fail!("An active transaction has no native transaction"),
			}
			// The marker is gone from the native stack
			self.savepoints.unwound();
		}
		Ok(())
	}

	/// Remove the latest savepoint, keeping every write made since
	pub fn pop_savepoint(&mut self) -> Result<()> {
		self.inner()?;
		self.savepoints.release()
	}

	/// Fetch a key from the datastore, ignoring the transaction
	pub fn raw_get<K: AsRef<[u8]>>(&self, p: &Partition, key: K) -> Result<Option<Pinned<'a>>> {
		self.ds.get(&self.cfg.raw_read, p, key)
	}

	/// Fetch many keys from the datastore, ignoring the transaction
	pub fn raw_multiget<I, K>(&self, p: &Partition, keys: I) -> Result<Vec<Result<Option<Fetched<'a>>>>>
	where
		I: IntoIterator<Item = K>,
		K: AsRef<[u8]>,
	{
		self.ds.multiget(&self.cfg.raw_read, p, keys)
	}

	/// Write a key to the datastore, ignoring the transaction
	pub fn raw_put<K, V>(&self, p: &Partition, key: K, val: V) -> Result<()>
	where
		K: AsRef<[u8]>,
		V: AsRef<[u8]>,
	{
		self.ds.put(&self.cfg.raw_write, p, key, val)
	}

	/// Delete a key from the datastore, ignoring the transaction
	pub fn raw_delete<K: AsRef<[u8]>>(&self, p: &Partition, key: K) -> Result<()> {
		self.ds.delete(&self.cfg.raw_write, p, key)
	}

	/// Delete every key in a range from the datastore, ignoring the transaction
	pub fn raw_delete_range<K: AsRef<[u8]>>(&self, p: &Partition, rng: Range<K>) -> Result<()> {
		self.ds.delete_range(&self.cfg.raw_write, p, rng)
	}

	/// Flush the memtable of a partition
	pub fn raw_flush(&self, p: &Partition) -> Result<()> {
		self.ds.flush(&self.cfg.flush, p)
	}

	/// Open a cursor over the datastore's view of a partition
	pub fn raw_iterator(&self, p: &Partition) -> Result<Cursor<'a>> {
		self.ds.iterator(&self.cfg.raw_read, p)
	}
}
