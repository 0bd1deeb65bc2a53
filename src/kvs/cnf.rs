use std::cmp::max;
use std::sync::LazyLock;

use sysinfo::System;

pub(super) static SYNC_DATA: LazyLock<bool> = lazy_env_parse!("ROCKBRIDGE_SYNC_DATA", bool, false);

pub(super) static THREAD_COUNT: LazyLock<i32> =
	lazy_env_parse!("ROCKBRIDGE_THREAD_COUNT", i32, || num_cpus::get() as i32);

pub(super) static JOBS_COUNT: LazyLock<i32> =
	lazy_env_parse!("ROCKBRIDGE_JOBS_COUNT", i32, || num_cpus::get() as i32 * 2);

pub(super) static MAX_OPEN_FILES: LazyLock<i32> =
	lazy_env_parse!("ROCKBRIDGE_MAX_OPEN_FILES", i32, 1024);

pub(super) static KEEP_LOG_FILE_NUM: LazyLock<usize> =
	lazy_env_parse!("ROCKBRIDGE_KEEP_LOG_FILE_NUM", usize, 20);

pub(super) static WRITE_BUFFER_SIZE: LazyLock<usize> =
	lazy_env_parse!("ROCKBRIDGE_WRITE_BUFFER_SIZE", usize, 64 * 1024 * 1024);

pub(super) static BLOCK_SIZE: LazyLock<usize> =
	lazy_env_parse!("ROCKBRIDGE_BLOCK_SIZE", usize, 64 * 1024);

pub(super) static BLOCK_CACHE_SIZE: LazyLock<usize> =
	lazy_env_parse!("ROCKBRIDGE_BLOCK_CACHE_SIZE", usize, || {
		// Load the system memory attributes
		let mut system = System::new();
		system.refresh_memory();
		// Divide the total system memory by 2
		let memory = system.total_memory().saturating_div(2);
		// Subtract 1 GiB from the memory size
		let memory = memory.saturating_sub(1024 * 1024 * 1024);
		// Take the larger of 64MiB or available memory
		max(memory as usize, 64 * 1024 * 1024)
	});

pub(super) static STORAGE_LOG_LEVEL: LazyLock<String> =
	lazy_env_parse!("ROCKBRIDGE_STORAGE_LOG_LEVEL", String, || "warn".to_string());

pub(super) static LOCK_TIMEOUT: LazyLock<i64> =
	lazy_env_parse!("ROCKBRIDGE_LOCK_TIMEOUT", i64, 1000);

pub(super) static DEADLOCK_DETECT: LazyLock<bool> =
	lazy_env_parse!("ROCKBRIDGE_DEADLOCK_DETECT", bool, false);
