#[test]
fn transaction_put_get_commit() {
	// Create a new datastore
	let (_dir, ds) = new_ds();
	let p = ds.default_partition().unwrap();
	// Create a writeable transaction
	let mut tx = ds.begin_transaction(config()).unwrap();
	assert_eq!(tx.lock_type(), LOCK);
	tx.put(&p, "test", "ok").unwrap();
	// The write is visible inside the transaction only
	assert_eq!(tx_get(&tx, &p, "test").as_deref(), Some(b"ok".as_slice()));
	assert_eq!(raw_get(&ds, &p, "test"), None);
	tx.commit().unwrap();
	assert!(tx.closed());
	assert_eq!(raw_get(&ds, &p, "test").as_deref(), Some(b"ok".as_slice()));
}

#[test]
fn transaction_delete() {
	// Create a new datastore
	let (_dir, ds) = new_ds();
	let p = ds.default_partition().unwrap();
	raw_put(&ds, &p, "test", "ok");
	let mut tx = ds.begin_transaction(config()).unwrap();
	tx.delete(&p, "test").unwrap();
	assert_eq!(tx_get(&tx, &p, "test"), None);
	assert!(raw_get(&ds, &p, "test").is_some());
	tx.commit().unwrap();
	assert_eq!(raw_get(&ds, &p, "test"), None);
}

#[test]
fn transaction_rollback_discards_writes() {
	// Create a new datastore
	let (_dir, ds) = new_ds();
	let p = ds.default_partition().unwrap();
	let mut tx = ds.begin_transaction(config()).unwrap();
	tx.put(&p, "test", "ok").unwrap();
	tx.rollback().unwrap();
	assert!(tx.closed());
	assert_eq!(raw_get(&ds, &p, "test"), None);
}

#[test]
fn transaction_dropped_is_rolled_back() {
	// Create a new datastore
	let (_dir, ds) = new_ds();
	let p = ds.default_partition().unwrap();
	{
		let mut tx = ds.begin_transaction(config()).unwrap();
		tx.check_level(Check::Warn);
		tx.put(&p, "test", "ok").unwrap();
	}
	assert_eq!(raw_get(&ds, &p, "test"), None);
	// The key is not left locked
	let mut tx = ds.begin_transaction(config()).unwrap();
	tx.put(&p, "test", "again").unwrap();
	tx.commit().unwrap();
	assert_eq!(raw_get(&ds, &p, "test").as_deref(), Some(b"again".as_slice()));
}

#[test]
fn transaction_finished_rejects_operations() {
	// Create a new datastore
	let (_dir, ds) = new_ds();
	let p = ds.default_partition().unwrap();
	for commit in [true, false] {
		let mut tx = ds.begin_transaction(config()).unwrap();
		tx.put(&p, "test", "ok").unwrap();
		match commit {
			true => tx.commit().unwrap(),
			false => tx.rollback().unwrap(),
		}
		assert!(matches!(tx.get(&p, "test"), Err(Error::TxFinished)));
		assert!(matches!(tx.get_for_update(&p, "test"), Err(Error::TxFinished)));
		assert!(matches!(tx.put(&p, "test", "no"), Err(Error::TxFinished)));
		assert!(matches!(tx.delete(&p, "test"), Err(Error::TxFinished)));
		assert!(matches!(tx.multiget(&p, ["test"]), Err(Error::TxFinished)));
		assert!(matches!(tx.iterator(&p), Err(Error::TxFinished)));
		assert!(matches!(tx.scan(&p, "a".."z", None), Err(Error::TxFinished)));
		assert!(matches!(tx.set_snapshot(), Err(Error::TxFinished)));
		assert!(matches!(tx.set_savepoint(), Err(Error::TxFinished)));
		assert!(matches!(tx.rollback_to_savepoint(), Err(Error::TxFinished)));
		assert!(matches!(tx.pop_savepoint(), Err(Error::TxFinished)));
		assert!(matches!(tx.commit(), Err(Error::TxFinished)));
		let err = tx.rollback().unwrap_err();
		assert!(matches!(err, Error::TxFinished));
		let status = err.status();
		assert_eq!(status.bridge, BridgeCode::TxFinished);
		assert_eq!(status.bridge as u8, 4);
		assert_eq!(status.severity, StatusSeverity::FatalError);
	}
}

#[test]
fn transaction_mode_mismatch() {
	// Create a new datastore
	let (_dir, ds) = new_ds();
	assert_eq!(ds.lock_type(), LOCK);
	assert!(ds.begin_transaction(other_config()).is_none());
	assert!(ds.begin_transaction(TransactionConfig::for_lock(LOCK)).is_some());
}

#[test]
fn transaction_get_for_update() {
	// Create a new datastore
	let (_dir, ds) = new_ds();
	let p = ds.default_partition().unwrap();
	raw_put(&ds, &p, "test", "ok");
	let mut tx = ds.begin_transaction(config()).unwrap();
	let val = tx.get_for_update(&p, "test").unwrap();
	assert_eq!(val.as_deref(), Some(b"ok".as_slice()));
	drop(val);
	assert!(tx.get_for_update(&p, "none").unwrap().is_none());
	tx.put(&p, "test", "updated").unwrap();
	tx.commit().unwrap();
	assert_eq!(raw_get(&ds, &p, "test").as_deref(), Some(b"updated".as_slice()));
}

#[test]
fn transaction_multiget_keeps_order() {
	// Create a new datastore
	let (_dir, ds) = new_ds();
	let p = ds.default_partition().unwrap();
	raw_put(&ds, &p, "k1", "one");
	let mut tx = ds.begin_transaction(config()).unwrap();
	tx.put(&p, "k3", "three").unwrap();
	let res = tx.multiget(&p, ["k3", "k2", "k1"]).unwrap();
	let res: Vec<Option<Vec<u8>>> =
		res.into_iter().map(|r| r.unwrap().map(|v| v.to_vec())).collect();
	assert_eq!(res, vec![Some(b"three".to_vec()), None, Some(b"one".to_vec())]);
	tx.commit().unwrap();
}

#[test]
fn transaction_scan_sees_own_writes() {
	// Create a new datastore
	let (_dir, ds) = new_ds();
	let p = ds.default_partition().unwrap();
	raw_put(&ds, &p, "a", "1");
	raw_put(&ds, &p, "c", "3");
	let mut tx = ds.begin_transaction(config()).unwrap();
	tx.put(&p, "b", "2").unwrap();
	tx.delete(&p, "c").unwrap();
	tx.put(&p, "d", "4").unwrap();
	let res = tx.scan(&p, "a".."z", None).unwrap();
	assert_eq!(keys_of(res), vec!["a", "b", "d"]);
	let res = tx.scanr(&p, "a".."z", Some(2)).unwrap();
	assert_eq!(keys_of(res), vec!["d", "b"]);
	let res = tx.scan(&p, "b".."d", None).unwrap();
	assert_eq!(res, vec![(b"b".to_vec(), b"2".to_vec())]);
	tx.commit().unwrap();
}

#[test]
fn transaction_on_dropped_partition() {
	// Create a new datastore
	let (_dir, ds) = new_ds();
	let p = ds.create_partition(&DbOptions::default(), "temp").unwrap();
	let mut tx = ds.begin_transaction(config()).unwrap();
	tx.put(&p, "test", "ok").unwrap();
	tx.commit().unwrap();
	ds.drop_partition("temp").unwrap();
	let mut tx = ds.begin_transaction(config()).unwrap();
	let Err(err) = tx.get(&p, "test") else {
		panic!("a dropped partition must not be readable")
	};
	assert!(matches!(err, Error::PartitionNotFound(ref n) if n == "temp"));
	assert_eq!(err.status().bridge, BridgeCode::PartitionNotFound);
	assert!(matches!(tx.put(&p, "test", "ok"), Err(Error::PartitionNotFound(_))));
	assert!(matches!(tx.multiget(&p, ["test"]), Err(Error::PartitionNotFound(_))));
	assert!(matches!(tx.iterator(&p), Err(Error::PartitionNotFound(_))));
	tx.rollback().unwrap();
}
