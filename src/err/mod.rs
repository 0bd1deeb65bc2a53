use std::fmt;

use thiserror::Error;

use crate::kvs::{BridgeCode, Status, StatusCode, StatusSeverity, StatusSubCode};

/// The result type returned by every fallible operation in this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error originating from the storage layer.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
	/// The crate encountered unreachable logic
	#[error("The storage layer encountered unreachable logic: {0}")]
	Unreachable(String),

	/// The storage engine returned a non-success status
	#[error("There was a problem with the storage engine: {message}")]
	Engine {
		status: Status,
		message: String,
	},

	/// A partition with this name is already registered
	#[error("The partition '{0}' already exists")]
	PartitionExists(String),

	/// No partition with this name is registered
	#[error("The partition '{0}' does not exist")]
	PartitionNotFound(String),

	/// The transaction was already rolled back or committed
	#[error("Couldn't update a finished transaction")]
	TxFinished,

	/// There is no savepoint to roll back to or release
	#[error("There is no savepoint set on this transaction")]
	TxNoSavepoint,

	/// An option value could not be applied
	#[error("Invalid storage option: {0}")]
	InvalidOption(String),
}

impl Error {
	#[track_caller]
	pub fn unreachable<T: fmt::Display>(message: T) -> Error {
		let location = std::panic::Location::caller();
		let message = format!("{}:{}: {}", location.file(), location.line(), message);
		Error::Unreachable(message)
	}

	/// The status record describing this error.
	///
	/// Bridge-level conditions carry a non-zero [`BridgeCode`] and the
	/// reserved `Max*` engine sentinels, so callers should check
	/// [`Status::bridge`] before looking at the engine fields.
	pub fn status(&self) -> Status {
		match self {
			Error::Engine {
				status,
				..
			} => *status,
			Error::PartitionExists(_) => Status::report_bridge(BridgeCode::PartitionExists),
			Error::PartitionNotFound(_) => Status::report_bridge(BridgeCode::PartitionNotFound),
			Error::TxFinished => Status::report_bridge(BridgeCode::TxFinished),
			Error::TxNoSavepoint => {
				Status::new(StatusCode::NotFound, StatusSubCode::None, StatusSeverity::NoError)
			}
			Error::InvalidOption(_) => {
				Status::new(StatusCode::InvalidArgument, StatusSubCode::None, StatusSeverity::NoError)
			}
			Error::Unreachable(_) => Status::new(
				StatusCode::MaxCode,
				StatusSubCode::MaxSubCode,
				StatusSeverity::UnrecoverableError,
			),
		}
	}

	/// Check if the failed operation can be retried by the caller.
	///
	/// Optimistic commit conflicts, lock contention and deadlocks all
	/// fall into this category.
	pub fn is_retryable(&self) -> bool {
		self.status().is_retryable()
	}

	/// Check if this error reports a missing key, savepoint or partition
	pub fn is_not_found(&self) -> bool {
		match self {
			Error::PartitionNotFound(_) => true,
			_ => self.status().is_not_found(),
		}
	}
}

impl From<rocksdb::Error> for Error {
	fn from(e: rocksdb::Error) -> Error {
		Error::Engine {
			status: Status::from(&e),
			message: e.into_string(),
		}
	}
}
