//! The module defining the key value store.
//!
//! Everything related the transaction for the key value store is defined in
//! the `tx.rs` file. This module enables the following operations on the key
//! value store:
//!
//! - creating and dropping named partitions of the key space
//! - pessimistic or optimistic transactions, chosen once per datastore
//! - raw reads and writes which bypass any transaction
//! - cursors over a transaction view or the raw engine view
//!
//! Every outcome can be described by a [`Status`] record, which keeps the
//! engine's own code, subcode and severity intact.

use std::fmt;
use std::ops::Deref;

use self::debug::Sprintable;

mod cmp;
mod cnf;
mod debug;
mod ds;
mod iter;
mod opts;
mod partition;
mod savepoint;
mod status;
mod tx;

#[cfg(test)]
mod tests;

pub use self::cmp::Comparator;
pub use self::ds::Datastore;
pub use self::iter::Cursor;
pub use self::opts::{
	DbOptions, FlushOpts, OptimisticOptions, PessimisticOptions, ReadOpts, TransactionConfig,
	TransactionDbOptions, TransactionOptions, WriteOpts,
};
pub use self::partition::{DEFAULT_PARTITION, Partition, PartitionHandle};
pub use self::status::{BridgeCode, Status, StatusCode, StatusSeverity, StatusSubCode};
pub use self::tx::{Check, Transaction};

/// The key part of a key-value pair. An alias for [`Vec<u8>`].
pub type Key = Vec<u8>;

/// The value part of a key-value pair. An alias for [`Vec<u8>`].
pub type Val = Vec<u8>;

/// A value read from the engine without copying, valid while its borrow lasts
pub type Pinned<'a> = rocksdb::DBPinnableSlice<'a>;

/// A value returned by a batched read.
///
/// The engine pins values where its batched read supports it and copies
/// them out otherwise. Both forms dereference to the value bytes.
pub enum Fetched<'a> {
	/// Borrowed straight from the engine
	Pinned(Pinned<'a>),
	/// Copied out of the engine
	Owned(Val),
}

impl Deref for Fetched<'_> {
	type Target = [u8];

	fn deref(&self) -> &[u8] {
		match self {
			Fetched::Pinned(v) => &**v,
			Fetched::Owned(v) => v.as_slice(),
		}
	}
}

impl AsRef<[u8]> for Fetched<'_> {
	fn as_ref(&self) -> &[u8] {
		self
	}
}

impl fmt::Debug for Fetched<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Fetched::Pinned(v) => write!(f, "Pinned({})", v.sprint()),
			Fetched::Owned(v) => write!(f, "Owned({})", v.sprint()),
		}
	}
}

/// The concurrency control strategy of a datastore
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum LockType {
	/// Conflicting writers block on row locks
	Pessimistic,
	/// Conflicts are detected when committing
	Optimistic,
}
