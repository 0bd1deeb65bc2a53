use std::ops::Range;

use rocksdb::{
	DBRawIteratorWithThreadMode, MultiThreaded, OptimisticTransactionDB, ReadOptions, TransactionDB,
};

use super::{Key, Val};
use crate::err::Result;

pub(crate) type PessimisticDb = TransactionDB<MultiThreaded>;
pub(crate) type OptimisticDb = OptimisticTransactionDB<MultiThreaded>;
pub(crate) type PessimisticTx<'a> = rocksdb::Transaction<'a, PessimisticDb>;
pub(crate) type OptimisticTx<'a> = rocksdb::Transaction<'a, OptimisticDb>;

pub(crate) enum Inner<'a> {
	/// A view through a pessimistic transaction
	PessimisticTx(DBRawIteratorWithThreadMode<'a, PessimisticTx<'a>>),
	/// A view through an optimistic transaction
	OptimisticTx(DBRawIteratorWithThreadMode<'a, OptimisticTx<'a>>),
	/// The raw view of a pessimistic datastore
	Pessimistic(DBRawIteratorWithThreadMode<'a, PessimisticDb>),
	/// The raw view of an optimistic datastore
	Optimistic(DBRawIteratorWithThreadMode<'a, OptimisticDb>),
}

macro_rules! dispatch {
	($inner:expr, $it:ident => $body:expr) => {
		match $inner {
			Inner::PessimisticTx($it) => $body,
			Inner::OptimisticTx($it) => $body,
			Inner::Pessimistic($it) => $body,
			Inner::Optimistic($it) => $body,
		}
	};
}

/// A positioned cursor over one partition.
///
/// The key and value buffers are borrowed from the cursor itself, so they
/// cannot be held across the next positioning call. While the cursor is
/// not valid, `key` and `value` return `None`.
pub struct Cursor<'a> {
	inner: Inner<'a>,
}

impl<'a> Cursor<'a> {
	pub(crate) fn new(inner: Inner<'a>) -> Self {
		Self {
			inner,
		}
	}

	/// Position at the first key of the partition
	pub fn seek_to_first(&mut self) {
		dispatch!(&mut self.inner, it => it.seek_to_first())
	}

	/// Position at the last key of the partition
	pub fn seek_to_last(&mut self) {
		dispatch!(&mut self.inner, it => it.seek_to_last())
	}

	/// Position at the first key at or after `key`
	pub fn seek<K: AsRef<[u8]>>(&mut self, key: K) {
		dispatch!(&mut self.inner, it => it.seek(key))
	}

	/// Position at the last key at or before `key`
	pub fn seek_for_prev<K: AsRef<[u8]>>(&mut self, key: K) {
		dispatch!(&mut self.inner, it => it.seek_for_prev(key))
	}

	/// Move to the next key, if positioned
	pub fn next(&mut self) {
		if self.valid() {
			dispatch!(&mut self.inner, it => it.next())
		}
	}

	/// Move to the previous key, if positioned
	pub fn prev(&mut self) {
		if self.valid() {
			dispatch!(&mut self.inner, it => it.prev())
		}
	}

	/// Check if the cursor is positioned at an entry
	pub fn valid(&self) -> bool {
		dispatch!(&self.inner, it => it.valid())
	}

	pub fn key(&self) -> Option<&[u8]> {
		dispatch!(&self.inner, it => it.key())
	}

	pub fn value(&self) -> Option<&[u8]> {
		dispatch!(&self.inner, it => it.value())
	}

	/// The current key and value together
	pub fn item(&self) -> Option<(&[u8], &[u8])> {
		dispatch!(&self.inner, it => it.item())
	}

	/// Check why the cursor stopped.
	///
	/// An exhausted cursor is not an error. An I/O failure or a corruption
	/// met while positioning is returned here.
	pub fn status(&self) -> Result<()> {
		dispatch!(&self.inner, it => it.status())?;
		Ok(())
	}

	/// Copy out every entry within the cursor's bounds
	pub(crate) fn collect_range(mut self, reverse: bool, limit: Option<usize>) -> Result<Vec<(Key, Val)>> {
		let limit = limit.unwrap_or(usize::MAX);
		let mut res = Vec::new();
		match reverse {
			false => self.seek_to_first(),
			true => self.seek_to_last(),
		}
		while res.len() < limit {
			let Some((k, v)) = self.item() else {
				break;
			};
			res.push((k.to_vec(), v.to_vec()));
			match reverse {
				false => self.next(),
				true => self.prev(),
			}
		}
		self.status()?;
		Ok(res)
	}
}

/// Restrict an iterator to the keys within a range.
///
/// The bounds are compared by the partition's comparator.
pub(crate) fn bound<K: AsRef<[u8]>>(ro: &mut ReadOptions, rng: Range<K>) {
	ro.set_iterate_lower_bound(rng.start.as_ref().to_vec());
	ro.set_iterate_upper_bound(rng.end.as_ref().to_vec());
}
