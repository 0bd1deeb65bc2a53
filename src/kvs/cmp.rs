use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

type CompareFn = dyn Fn(&[u8], &[u8]) -> Ordering + Send + Sync;

/// A caller-supplied key ordering installed into every partition.
///
/// The engine persists the comparator name alongside the data, so the same
/// name must be supplied every time a given path is opened.
#[derive(Clone)]
pub struct Comparator {
	name: String,
	compare: Arc<CompareFn>,
	different_bytes_can_be_equal: bool,
}

impl Comparator {
	/// Create a new named comparator.
	///
	/// Set `different_bytes_can_be_equal` when two byte-distinct keys may
	/// compare as [`Ordering::Equal`].
	pub fn new<F>(name: impl Into<String>, compare: F, different_bytes_can_be_equal: bool) -> Self
	where
		F: Fn(&[u8], &[u8]) -> Ordering + Send + Sync + 'static,
	{
		Self {
			name: name.into(),
			compare: Arc::new(compare),
			different_bytes_can_be_equal,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn different_bytes_can_be_equal(&self) -> bool {
		self.different_bytes_can_be_equal
	}

	pub fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
		(self.compare)(a, b)
	}

	/// Install this comparator into a set of engine options
	pub(crate) fn apply(&self, opts: &mut rocksdb::Options) {
		let compare = self.compare.clone();
		opts.set_comparator(self.name.as_str(), Box::new(move |a: &[u8], b: &[u8]| compare(a, b)));
	}
}

impl fmt::Debug for Comparator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Comparator")
			.field("name", &self.name)
			.field("different_bytes_can_be_equal", &self.different_bytes_can_be_equal)
			.finish()
	}
}
