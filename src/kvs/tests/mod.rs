use temp_dir::TempDir;

use crate::kvs::{Datastore, DbOptions, LockType};

/// Open a new datastore in a fresh directory.
///
/// The directory is removed when the returned guard is dropped, so it must
/// outlive the datastore.
fn open_ds(lock: LockType, opts: &DbOptions) -> (TempDir, Datastore) {
	let dir = TempDir::new().unwrap();
	let ds = Datastore::open(lock, opts, dir.path()).unwrap();
	(dir, ds)
}

#[test]
fn datastore_is_send_sync() {
	fn check<T: Send + Sync>() {}
	check::<Datastore>();
}

mod pessimistic {

	use crate::err::Error;
	use crate::kvs::*;
	use temp_dir::TempDir;
	use test_log::test;

	const LOCK: LockType = LockType::Pessimistic;

	fn new_ds() -> (TempDir, Datastore) {
		super::open_ds(LOCK, &DbOptions::default())
	}

	fn config() -> TransactionConfig {
		TransactionConfig::pessimistic(PessimisticOptions::default())
	}

	fn other_config() -> TransactionConfig {
		TransactionConfig::optimistic(OptimisticOptions::default())
	}

	fn snapshot_config() -> TransactionConfig {
		TransactionConfig::pessimistic(PessimisticOptions::default().with_snapshot(true))
	}

	include!("helper.rs");
	include!("raw.rs");
	include!("transaction.rs");
	include!("savepoint.rs");
	include!("snapshot.rs");
	include!("iterator.rs");
	include!("registry.rs");
	include!("pessimistic_locking.rs");
}

mod optimistic {

	use crate::err::Error;
	use crate::kvs::*;
	use temp_dir::TempDir;
	use test_log::test;

	const LOCK: LockType = LockType::Optimistic;

	fn new_ds() -> (TempDir, Datastore) {
		super::open_ds(LOCK, &DbOptions::default())
	}

	fn config() -> TransactionConfig {
		TransactionConfig::optimistic(OptimisticOptions::default())
	}

	fn other_config() -> TransactionConfig {
		TransactionConfig::pessimistic(PessimisticOptions::default())
	}

	fn snapshot_config() -> TransactionConfig {
		TransactionConfig::optimistic(OptimisticOptions::default().with_snapshot(true))
	}

	include!("helper.rs");
	include!("raw.rs");
	include!("transaction.rs");
	include!("savepoint.rs");
	include!("snapshot.rs");
	include!("iterator.rs");
	include!("registry.rs");
	include!("optimistic_conflict.rs");
}
