#[test]
fn conflict_write_write() {
	// Create a new datastore
	let (_dir, ds) = new_ds();
	let p = ds.default_partition().unwrap();
	raw_put(&ds, &p, "test", "v0");
	let mut tx1 = ds.begin_transaction(config()).unwrap();
	let mut tx2 = ds.begin_transaction(config()).unwrap();
	assert!(tx1.get_for_update(&p, "test").unwrap().is_some());
	assert!(tx2.get_for_update(&p, "test").unwrap().is_some());
	// Neither write blocks
	tx1.put(&p, "test", "v1").unwrap();
	tx2.put(&p, "test", "v2").unwrap();
	tx1.commit().unwrap();
	// The second commit detects the conflict
	let err = tx2.commit().unwrap_err();
	assert!(matches!(err, Error::Engine { .. }));
	assert_eq!(err.status().code, StatusCode::Busy);
	assert!(err.status().is_busy());
	assert!(err.is_retryable());
	// A failed commit still finishes the transaction
	assert!(tx2.closed());
	assert!(matches!(tx2.commit(), Err(Error::TxFinished)));
	assert_eq!(raw_get(&ds, &p, "test").as_deref(), Some(b"v1".as_slice()));
}

#[test]
fn conflict_tracked_read() {
	// Create a new datastore
	let (_dir, ds) = new_ds();
	let p = ds.default_partition().unwrap();
	raw_put(&ds, &p, "test", "v0");
	let mut tx1 = ds.begin_transaction(config()).unwrap();
	// Reading for update tracks the key without writing it
	assert!(tx1.get_for_update(&p, "test").unwrap().is_some());
	tx1.put(&p, "other", "v1").unwrap();
	raw_put(&ds, &p, "test", "v2");
	let err = tx1.commit().unwrap_err();
	assert_eq!(err.status().code, StatusCode::Busy);
	assert_eq!(raw_get(&ds, &p, "other"), None);
}

#[test]
fn conflict_untracked_read() {
	// Create a new datastore
	let (_dir, ds) = new_ds();
	let p = ds.default_partition().unwrap();
	raw_put(&ds, &p, "test", "v0");
	let mut tx1 = ds.begin_transaction(config()).unwrap();
	// A plain read is not validated at commit
	assert_eq!(tx_get(&tx1, &p, "test").as_deref(), Some(b"v0".as_slice()));
	tx1.put(&p, "other", "v1").unwrap();
	raw_put(&ds, &p, "test", "v2");
	tx1.commit().unwrap();
	assert_eq!(raw_get(&ds, &p, "other").as_deref(), Some(b"v1".as_slice()));
	assert_eq!(raw_get(&ds, &p, "test").as_deref(), Some(b"v2".as_slice()));
}

#[test]
fn conflict_retry_succeeds() {
	// Create a new datastore
	let (_dir, ds) = new_ds();
	let p = ds.default_partition().unwrap();
	raw_put(&ds, &p, "counter", "0");
	let mut tx1 = ds.begin_transaction(config()).unwrap();
	let mut tx2 = ds.begin_transaction(config()).unwrap();
	assert!(tx2.get_for_update(&p, "counter").unwrap().is_some());
	tx1.put(&p, "counter", "1").unwrap();
	tx1.commit().unwrap();
	tx2.put(&p, "counter", "1").unwrap();
	let err = tx2.commit().unwrap_err();
	assert!(err.is_retryable());
	// Retrying in a new transaction sees the committed value
	let mut tx3 = ds.begin_transaction(config()).unwrap();
	let val = tx3.get_for_update(&p, "counter").unwrap().map(|v| v.to_vec());
	assert_eq!(val.as_deref(), Some(b"1".as_slice()));
	tx3.put(&p, "counter", "2").unwrap();
	tx3.commit().unwrap();
	assert_eq!(raw_get(&ds, &p, "counter").as_deref(), Some(b"2".as_slice()));
}

#[test]
fn conflict_snapshot_get_for_update() {
	// Create a new datastore
	let (_dir, ds) = new_ds();
	let p = ds.default_partition().unwrap();
	raw_put(&ds, &p, "test", "v0");
	raw_put(&ds, &p, "still", "v0");
	let mut tx = ds.begin_transaction(config()).unwrap();
	tx.set_snapshot().unwrap();
	raw_put(&ds, &p, "test", "v1");
	// A key changed after the snapshot cannot be read for update
	let err = tx.get_for_update(&p, "test").unwrap_err();
	assert!(matches!(err, Error::Engine { .. }));
	assert_eq!(err.status().code, StatusCode::Busy);
	assert!(err.is_retryable());
	assert!(!tx.closed());
	// An unchanged key is read from the snapshot view and commits
	let val = tx.get_for_update(&p, "still").unwrap().map(|v| v.to_vec());
	assert_eq!(val.as_deref(), Some(b"v0".as_slice()));
	tx.put(&p, "still", "v2").unwrap();
	tx.commit().unwrap();
	assert_eq!(raw_get(&ds, &p, "still").as_deref(), Some(b"v2".as_slice()));
	assert_eq!(raw_get(&ds, &p, "test").as_deref(), Some(b"v1".as_slice()));
}
