//! Translation of storage engine outcomes into caller-visible status records.
//!
//! A [`Status`] mirrors the engine's own `code`, `subcode` and `severity`
//! triple and adds a `bridge` code for conditions which only this layer can
//! detect, such as a missing or duplicate partition. The all-zero record is
//! the success sentinel.

use std::fmt;

use rocksdb::ErrorKind;

/// The primary status code reported by the storage engine.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum StatusCode {
	#[default]
	Ok = 0,
	NotFound = 1,
	Corruption = 2,
	NotSupported = 3,
	InvalidArgument = 4,
	IOError = 5,
	MergeInProgress = 6,
	Incomplete = 7,
	ShutdownInProgress = 8,
	TimedOut = 9,
	Aborted = 10,
	Busy = 11,
	Expired = 12,
	TryAgain = 13,
	CompactionTooLarge = 14,
	ColumnFamilyDropped = 15,
	/// Reserved, never produced by the engine
	MaxCode = 16,
}

/// The secondary status code, refining the primary [`StatusCode`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum StatusSubCode {
	#[default]
	None = 0,
	MutexTimeout = 1,
	LockTimeout = 2,
	LockLimit = 3,
	NoSpace = 4,
	Deadlock = 5,
	StaleFile = 6,
	MemoryLimit = 7,
	SpaceLimit = 8,
	PathNotFound = 9,
	MergeOperandsInsufficientCapacity = 10,
	ManualCompactionPaused = 11,
	Overwritten = 12,
	TxnNotPrepared = 13,
	IOFenced = 14,
	MergeOperatorFailed = 15,
	MergeOperandThresholdExceeded = 16,
	/// Reserved, never produced by the engine
	MaxSubCode = 17,
}

/// How severe a background or foreground failure is.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum StatusSeverity {
	#[default]
	NoError = 0,
	SoftError = 1,
	HardError = 2,
	FatalError = 3,
	UnrecoverableError = 4,
	/// Reserved, never produced by the engine
	MaxSeverity = 5,
}

/// Conditions which the engine itself cannot represent.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum BridgeCode {
	/// Use the engine's code, subcode and severity verbatim
	#[default]
	None = 0,
	/// A partition with the requested name already exists
	PartitionExists = 2,
	/// No partition with the requested name exists
	PartitionNotFound = 3,
	/// The transaction was already committed or rolled back
	TxFinished = 4,
}

/// The messages the engine appends to its status text for each subcode.
const SUBCODE_MESSAGES: [(StatusSubCode, &str); 16] = [
	(StatusSubCode::MutexTimeout, "Timeout Acquiring Mutex"),
	(StatusSubCode::LockTimeout, "Timeout waiting to lock key"),
	(StatusSubCode::LockLimit, "Failed to acquire lock due to max_num_locks limit"),
	(StatusSubCode::NoSpace, "No space left on device"),
	(StatusSubCode::Deadlock, "Deadlock"),
	(StatusSubCode::StaleFile, "Stale file handle"),
	(StatusSubCode::MemoryLimit, "Memory limit reached"),
	(StatusSubCode::SpaceLimit, "Space limit reached"),
	(StatusSubCode::PathNotFound, "No such file or directory"),
	(StatusSubCode::MergeOperandsInsufficientCapacity, "Insufficient capacity for merge operands"),
	(StatusSubCode::ManualCompactionPaused, "Manual compaction paused"),
	(StatusSubCode::Overwritten, " (overwritten)"),
	(StatusSubCode::TxnNotPrepared, "Txn not prepared"),
	(StatusSubCode::IOFenced, "IO fenced off"),
	(StatusSubCode::MergeOperatorFailed, "Merge operator failed"),
	(StatusSubCode::MergeOperandThresholdExceeded, "Number of operands merged exceeded threshold"),
];

/// A caller-visible status record.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Status {
	pub code: StatusCode,
	pub subcode: StatusSubCode,
	pub severity: StatusSeverity,
	pub bridge: BridgeCode,
}

impl Status {
	/// Build a record from an engine triple, applying the success rule
	pub fn new(code: StatusCode, subcode: StatusSubCode, severity: StatusSeverity) -> Status {
		let mut status = Status::default();
		status.report(code, subcode, severity);
		status
	}

	/// Write an engine outcome into this record.
	///
	/// An `Ok` code with a `None` or `NoSpace` subcode and no severity is
	/// informational only, and leaves the record untouched. Anything else
	/// is written through verbatim.
	pub fn report(&mut self, code: StatusCode, subcode: StatusSubCode, severity: StatusSeverity) {
		let benign = matches!(subcode, StatusSubCode::None | StatusSubCode::NoSpace);
		if code != StatusCode::Ok || !benign || severity != StatusSeverity::NoError {
			self.code = code;
			self.subcode = subcode;
			self.severity = severity;
			self.bridge = BridgeCode::None;
		}
	}

	/// Build a record for a condition which only this layer can detect
	pub fn report_bridge(kind: BridgeCode) -> Status {
		let severity = match kind {
			BridgeCode::None => return Status::default(),
			BridgeCode::PartitionExists | BridgeCode::PartitionNotFound => StatusSeverity::SoftError,
			BridgeCode::TxFinished => StatusSeverity::FatalError,
		};
		Status {
			code: StatusCode::MaxCode,
			subcode: StatusSubCode::MaxSubCode,
			severity,
			bridge: kind,
		}
	}

	/// The status of an engine call
	pub fn of<T>(res: &Result<T, rocksdb::Error>) -> Status {
		match res {
			Ok(_) => Status::default(),
			Err(e) => Status::from(e),
		}
	}

	/// Check if this is the success sentinel
	pub fn is_ok(&self) -> bool {
		*self == Status::default()
	}

	/// Check if this status was raised by this layer rather than the engine
	pub fn is_bridge(&self) -> bool {
		self.bridge != BridgeCode::None
	}

	pub fn is_not_found(&self) -> bool {
		match self.bridge {
			BridgeCode::PartitionNotFound => true,
			BridgeCode::None => self.code == StatusCode::NotFound,
			_ => false,
		}
	}

	pub fn is_busy(&self) -> bool {
		!self.is_bridge() && self.code == StatusCode::Busy
	}

	pub fn is_timed_out(&self) -> bool {
		!self.is_bridge() && self.code == StatusCode::TimedOut
	}

	pub fn is_deadlock(&self) -> bool {
		!self.is_bridge() && self.subcode == StatusSubCode::Deadlock
	}

	/// Check if re-running the transaction may succeed
	pub fn is_retryable(&self) -> bool {
		!self.is_bridge()
			&& matches!(self.code, StatusCode::Busy | StatusCode::TryAgain | StatusCode::TimedOut)
	}
}

impl From<ErrorKind> for StatusCode {
	fn from(kind: ErrorKind) -> StatusCode {
		#[allow(unreachable_patterns)]
		match kind {
			ErrorKind::NotFound => StatusCode::NotFound,
			ErrorKind::Corruption => StatusCode::Corruption,
			ErrorKind::NotSupported => StatusCode::NotSupported,
			ErrorKind::InvalidArgument => StatusCode::InvalidArgument,
			ErrorKind::IOError => StatusCode::IOError,
			ErrorKind::MergeInProgress => StatusCode::MergeInProgress,
			ErrorKind::Incomplete => StatusCode::Incomplete,
			ErrorKind::ShutdownInProgress => StatusCode::ShutdownInProgress,
			ErrorKind::TimedOut => StatusCode::TimedOut,
			ErrorKind::Aborted => StatusCode::Aborted,
			ErrorKind::Busy => StatusCode::Busy,
			ErrorKind::Expired => StatusCode::Expired,
			ErrorKind::TryAgain => StatusCode::TryAgain,
			ErrorKind::CompactionTooLarge => StatusCode::CompactionTooLarge,
			ErrorKind::ColumnFamilyDropped => StatusCode::ColumnFamilyDropped,
			_ => StatusCode::MaxCode,
		}
	}
}

impl StatusSubCode {
	/// Recover the subcode from the engine's status text.
	///
	/// The engine renders a status as `<code>: <subcode><: state>`, so only
	/// the text directly after the code prefix names the subcode. Paths and
	/// keys echoed in the state are never matched.
	pub fn parse(message: &str) -> StatusSubCode {
		let rest = match message.split_once(": ") {
			Some((_, rest)) => rest,
			None => return StatusSubCode::None,
		};
		SUBCODE_MESSAGES
			.iter()
			.find(|(_, m)| rest.starts_with(m))
			.map(|(c, _)| *c)
			.unwrap_or(StatusSubCode::None)
	}
}

impl From<&rocksdb::Error> for Status {
	fn from(e: &rocksdb::Error) -> Status {
		// The C boundary only carries the code and the rendered text
		let mut status = Status::default();
		status.report(
			e.kind().into(),
			StatusSubCode::parse(&e.to_string()),
			StatusSeverity::NoError,
		);
		status
	}
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.bridge {
			BridgeCode::None => write!(f, "{:?}/{:?}/{:?}", self.code, self.subcode, self.severity),
			b => write!(f, "bridge:{b:?}"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn success_sentinel_is_zero() {
		let s = Status::default();
		assert!(s.is_ok());
		assert_eq!(s.code as u8, 0);
		assert_eq!(s.subcode as u8, 0);
		assert_eq!(s.severity as u8, 0);
		assert_eq!(s.bridge as u8, 0);
	}

	#[test]
	fn informational_subcode_is_not_written() {
		let mut s = Status::default();
		s.report(StatusCode::Ok, StatusSubCode::NoSpace, StatusSeverity::NoError);
		assert!(s.is_ok());
		s.report(StatusCode::Ok, StatusSubCode::None, StatusSeverity::NoError);
		assert!(s.is_ok());
	}

	#[test]
	fn other_combinations_are_verbatim() {
		let mut s = Status::default();
		s.report(StatusCode::Ok, StatusSubCode::Overwritten, StatusSeverity::NoError);
		assert!(!s.is_ok());
		assert_eq!(s.subcode, StatusSubCode::Overwritten);
		let mut s = Status::default();
		s.report(StatusCode::Ok, StatusSubCode::None, StatusSeverity::SoftError);
		assert_eq!(s.severity, StatusSeverity::SoftError);
		let s = Status::new(StatusCode::IOError, StatusSubCode::NoSpace, StatusSeverity::HardError);
		assert_eq!(s.code, StatusCode::IOError);
		assert_eq!(s.subcode, StatusSubCode::NoSpace);
		assert_eq!(s.severity, StatusSeverity::HardError);
		assert_eq!(s.bridge, BridgeCode::None);
	}

	#[test]
	fn bridge_codes_use_reserved_sentinels() {
		let s = Status::report_bridge(BridgeCode::PartitionExists);
		assert_eq!(s.bridge as u8, 2);
		assert_eq!(s.code, StatusCode::MaxCode);
		assert_eq!(s.subcode, StatusSubCode::MaxSubCode);
		assert!(s.is_bridge());
		assert!(!s.is_busy());
		let s = Status::report_bridge(BridgeCode::PartitionNotFound);
		assert_eq!(s.bridge as u8, 3);
		assert!(s.is_not_found());
		assert!(Status::report_bridge(BridgeCode::None).is_ok());
	}

	#[test]
	fn subcodes_are_recovered_from_text() {
		assert_eq!(StatusSubCode::parse("Resource busy: Deadlock"), StatusSubCode::Deadlock);
		assert_eq!(
			StatusSubCode::parse("Operation timed out: Timeout waiting to lock key"),
			StatusSubCode::LockTimeout
		);
		assert_eq!(
			StatusSubCode::parse("IO error: No space left on device: /tmp/db"),
			StatusSubCode::NoSpace
		);
		assert_eq!(StatusSubCode::parse("Resource busy: "), StatusSubCode::None);
		assert_eq!(StatusSubCode::parse("Deadlock"), StatusSubCode::None);
	}

	#[test]
	fn subcodes_ignore_echoed_state() {
		// A path or key in the state text is not a subcode
		assert_eq!(
			StatusSubCode::parse("IO error: While open a file for appending: /tmp/Deadlock/000012.log"),
			StatusSubCode::None
		);
		assert_eq!(
			StatusSubCode::parse("Corruption: bad block for key Timeout waiting to lock key"),
			StatusSubCode::None
		);
		assert_eq!(
			StatusSubCode::parse("IO error: No such file or directory: /tmp/Deadlock/CURRENT"),
			StatusSubCode::PathNotFound
		);
	}

	#[test]
	fn engine_errors_are_translated() {
		let s = Status::new(
			ErrorKind::Busy.into(),
			StatusSubCode::parse("Resource busy: Deadlock"),
			StatusSeverity::NoError,
		);
		assert_eq!(s.code, StatusCode::Busy);
		assert!(s.is_deadlock());
		assert!(s.is_retryable());
		assert_eq!(StatusCode::from(ErrorKind::Unknown), StatusCode::MaxCode);
		let ok: Result<(), rocksdb::Error> = Ok(());
		assert!(Status::of(&ok).is_ok());
	}
}
