use crate::err::{Error, Result};

/// Tracks the savepoint markers set on a native transaction.
///
/// The engine can set a marker and roll back to the latest one, but cannot
/// discard a marker on its own. A released marker therefore stays on the
/// native stack and is only flagged here. Rolling back to the latest live
/// marker unwinds every released marker above it first, which reverts the
/// same writes as if those markers had never existed.
#[derive(Debug, Default)]
pub(crate) struct SavePoints {
	/// One entry per native marker, `true` while still live
	stack: Vec<bool>,
}

impl SavePoints {
	/// Record a new native marker
	pub(crate) fn push(&mut self) {
		self.stack.push(true);
	}

	/// The number of live savepoints
	pub(crate) fn len(&self) -> usize {
		self.stack.iter().filter(|live| **live).count()
	}

	/// Release the latest live savepoint without reverting any writes
	pub(crate) fn release(&mut self) -> Result<()> {
		match self.stack.iter_mut().rev().find(|live| **live) {
			Some(live) => {
				*live = false;
				Ok(())
			}
			None => Err(Error::TxNoSavepoint),
		}
	}

	/// The number of native rollbacks needed to revert to the latest live
	/// savepoint, unwinding every released marker above it.
	pub(crate) fn depth(&self) -> Result<usize> {
		match self.stack.iter().rposition(|live| *live) {
			Some(pos) => Ok(self.stack.len() - pos),
			None => Err(Error::TxNoSavepoint),
		}
	}

	/// Forget the topmost marker once the native rollback to it succeeded
	pub(crate) fn unwound(&mut self) {
		self.stack.pop();
	}

	pub(crate) fn clear(&mut self) {
		self.stack.clear();
	}
}
