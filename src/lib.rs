//! # rocksbridge
//!
//! A transaction routing layer over an embedded RocksDB engine.
//!
//! A [`Datastore`](kvs::Datastore) is opened in either pessimistic or
//! optimistic mode. It hands out [`Transaction`](kvs::Transaction)s of that
//! mode, a raw path which bypasses transactions, named partitions which can
//! be created and dropped while in use, and [`Cursor`](kvs::Cursor)s which
//! borrow keys and values straight from the engine.
//!
//! ```no_run
//! use rocksbridge::kvs::{Datastore, DbOptions, LockType, TransactionConfig};
//!
//! # fn main() -> rocksbridge::err::Result<()> {
//! let ds = Datastore::open(LockType::Optimistic, &DbOptions::default(), "/tmp/rocksbridge")?;
//! let users = ds.create_partition(&DbOptions::default(), "users")?;
//! let mut tx = ds.begin_transaction(TransactionConfig::for_lock(LockType::Optimistic)).unwrap();
//! tx.put(&users, b"alice", b"admin")?;
//! tx.commit()?;
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate tracing;

#[macro_use]
mod mac;

pub mod err;
pub mod kvs;
