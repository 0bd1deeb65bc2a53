//! Debug purposes only. It may be used in logs. Not for key handling in implementation code.

/// Renders keys as escaped strings for tracing output
pub(crate) trait Sprintable {
	fn sprint(&self) -> String;
}

impl<T: AsRef<[u8]> + ?Sized> Sprintable for T {
	fn sprint(&self) -> String {
		self.as_ref()
			.iter()
			.flat_map(|&byte| std::ascii::escape_default(byte))
			.map(|byte| byte as char)
			.collect::<String>()
	}
}
