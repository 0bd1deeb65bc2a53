/// A macro that allows lazily parsing a value from the environment variable,
/// with a fallback default value if the variable is not set or parsing fails.
///
/// # Parameters
///
/// - `$key`: An expression representing the name of the environment variable.
/// - `$t`: The type of the value to be parsed.
/// - `$default`: The default value to fall back to if the environment variable is not set or
///   parsing fails.
///
/// # Return Value
///
/// A lazy static variable of type `std::sync::LazyLock`, which holds the parsed
/// value from the environment variable or the default value.
#[macro_export]
macro_rules! lazy_env_parse {
	// With no default specified
	($key:expr, $t:ty) => {
		std::sync::LazyLock::new(|| {
			std::env::var($key).ok().and_then(|s| s.parse::<$t>().ok()).unwrap_or_default()
		})
	};
	// With a closure for the default value
	($key:expr, $t:ty, || $default:expr) => {
		std::sync::LazyLock::new(|| {
			std::env::var($key).ok().and_then(|s| s.parse::<$t>().ok()).unwrap_or_else(|| $default)
		})
	};
	// With a static expression for the default value
	($key:expr, $t:ty, $default:expr) => {
		std::sync::LazyLock::new(|| {
			std::env::var($key).ok().and_then(|s| s.parse::<$t>().ok()).unwrap_or($default)
		})
	};
}

/// Throws an unreachable error with location details
macro_rules! fail {
	($($arg:tt)+) => {
		return Err($crate::err::Error::unreachable(format_args!($($arg)*)))
	};
}

/// Returns early with the given error if the condition does not hold
macro_rules! ensure {
	($cond:expr, $err:expr $(,)?) => {
		if !$cond {
			return Err($err);
		}
	};
}

#[cfg(test)]
mod test {
	use std::sync::LazyLock;

	use crate::err::Error;

	fn fail_func() -> Result<(), Error> {
		fail!("Reached unreachable code");
	}

	fn fail_func_args() -> Result<(), Error> {
		fail!("Found {} but expected {}", "test", "other");
	}

	fn ensure_func(v: bool) -> Result<(), Error> {
		ensure!(v, Error::TxFinished);
		Ok(())
	}

	#[test]
	fn fail_literal() {
		let Err(Error::Unreachable(msg)) = fail_func() else {
			panic!()
		};
		assert!(msg.starts_with("src/mac/mod.rs:"), "{msg}");
		assert!(msg.ends_with(": Reached unreachable code"), "{msg}");
	}

	#[test]
	fn fail_arguments() {
		let Err(Error::Unreachable(msg)) = fail_func_args() else {
			panic!()
		};
		assert!(msg.ends_with(": Found test but expected other"), "{msg}");
	}

	#[test]
	fn ensure_condition() {
		assert!(ensure_func(true).is_ok());
		assert!(matches!(ensure_func(false), Err(Error::TxFinished)));
	}

	#[test]
	fn lazy_env_fallback() {
		static UNSET: LazyLock<u64> = lazy_env_parse!("ROCKBRIDGE_TEST_UNSET_VARIABLE", u64, 42);
		static UNSET_DEFAULT: LazyLock<bool> =
			lazy_env_parse!("ROCKBRIDGE_TEST_UNSET_VARIABLE", bool);
		static UNSET_CLOSURE: LazyLock<usize> =
			lazy_env_parse!("ROCKBRIDGE_TEST_UNSET_VARIABLE", usize, || 2 * 8);
		assert_eq!(*UNSET, 42);
		assert!(!*UNSET_DEFAULT);
		assert_eq!(*UNSET_CLOSURE, 16);
	}
}
