//! The registry of named partitions open on a datastore.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::err::{Error, Result};

const TARGET: &str = "rocksbridge::kvs::partition";

/// The name of the partition which always exists
pub const DEFAULT_PARTITION: &str = "default";

/// A named partition of the key space.
///
/// Handles are shared between the registry and any number of callers. Once
/// the partition is dropped the handle stays valid as a value, but every
/// operation through it reports that the partition does not exist, even if a
/// partition of the same name is created again later.
#[derive(Debug)]
pub struct Partition {
	name: String,
	dropped: AtomicBool,
}

/// A shared reference to a [`Partition`]
pub type PartitionHandle = Arc<Partition>;

impl Partition {
	fn new(name: String) -> PartitionHandle {
		Arc::new(Partition {
			name,
			dropped: AtomicBool::new(false),
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Check if this partition has been dropped
	pub fn is_dropped(&self) -> bool {
		self.dropped.load(Ordering::Acquire)
	}

	fn mark_dropped(&self) {
		self.dropped.store(true, Ordering::Release);
	}
}

/// Maps partition names to their live handles
#[derive(Debug)]
pub(crate) struct Registry {
	handles: RwLock<HashMap<String, PartitionHandle>>,
}

impl Registry {
	/// Build a registry for the partitions the engine opened
	pub(crate) fn new<I, S>(names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let handles = names
			.into_iter()
			.map(Into::into)
			.map(|name: String| (name.clone(), Partition::new(name)))
			.collect();
		Self {
			handles: RwLock::new(handles),
		}
	}

	/// Look up a live partition by name
	pub(crate) fn get(&self, name: &str) -> Option<PartitionHandle> {
		self.handles.read().get(name).cloned()
	}

	/// The default partition, which exists for as long as the datastore
	pub(crate) fn default_partition(&self) -> Result<PartitionHandle> {
		match self.get(DEFAULT_PARTITION) {
			Some(handle) => Ok(handle),
			None => fail!("The default partition is missing from the registry"),
		}
	}

	/// Register a new partition, running `create` to make it in the engine.
	///
	/// Nothing is registered if `create` fails.
	pub(crate) fn create<F>(&self, name: &str, create: F) -> Result<PartitionHandle>
	where
		F: FnOnce() -> Result<()>,
	{
		// Reject without contending on the exclusive lock
		ensure!(!self.handles.read().contains_key(name), Error::PartitionExists(name.to_owned()));
		let mut handles = self.handles.write();
		// Another writer may have won the race
		ensure!(!handles.contains_key(name), Error::PartitionExists(name.to_owned()));
		create()?;
		let handle = Partition::new(name.to_owned());
		handles.insert(name.to_owned(), handle.clone());
		debug!(target: TARGET, name, "Created partition");
		Ok(handle)
	}

	/// Unregister a partition, running `drop` to remove it from the engine.
	///
	/// The entry is unlinked and the handle marked dropped even if `drop`
	/// fails, and the failure is returned to the caller.
	pub(crate) fn remove<F>(&self, name: &str, drop: F) -> Result<()>
	where
		F: FnOnce() -> Result<()>,
	{
		let mut handles = self.handles.write();
		ensure!(handles.contains_key(name), Error::PartitionNotFound(name.to_owned()));
		let res = drop();
		if let Some(handle) = handles.remove(name) {
			handle.mark_dropped();
		}
		match &res {
			Ok(_) => debug!(target: TARGET, name, "Dropped partition"),
			Err(e) => warn!(target: TARGET, name, "Partition unlinked after a failed drop: {e}"),
		}
		res
	}

	/// The names of all live partitions, in no particular order
	pub(crate) fn names(&self) -> Vec<String> {
		self.handles.read().keys().cloned().collect()
	}
}
