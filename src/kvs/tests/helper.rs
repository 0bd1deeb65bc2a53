/// Fetch a key through the raw path as an owned value
fn raw_get(ds: &Datastore, p: &Partition, key: &str) -> Option<Vec<u8>> {
	ds.get(&ReadOpts::default(), p, key).unwrap().map(|v| v.to_vec())
}

/// Write a key through the raw path
fn raw_put(ds: &Datastore, p: &Partition, key: &str, val: &str) {
	ds.put(&WriteOpts::default(), p, key, val).unwrap()
}

/// Fetch a key through a transaction as an owned value
fn tx_get(tx: &Transaction, p: &Partition, key: &str) -> Option<Vec<u8>> {
	tx.get(p, key).unwrap().map(|v| v.to_vec())
}

/// Collect the keys of a scan result
fn keys_of(res: Vec<(Key, Val)>) -> Vec<String> {
	res.into_iter().map(|(k, _)| String::from_utf8(k).unwrap()).collect()
}
