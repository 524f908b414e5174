// src/config/constants.rs
//! Capture-wide configuration constants

/// Device link constants
pub mod device {
    /// Placeholder address used until one is configured
    pub const DEFAULT_ADDRESS: &str = "00:00:00:00:00:00";
    pub const DEFAULT_DISCOVERY_TIMEOUT_MS: u64 = 10_000;
    /// Settling delay between connecting and switching streaming mode
    pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1_000;
    pub const MAX_SETTLE_DELAY_MS: u64 = 30_000;
}

/// Acquisition timing constants
pub mod timing {
    pub const DEFAULT_PREPARE_MS: u64 = 3_000;
    pub const DEFAULT_RECORD_MS: u64 = 5_000;
    pub const DEFAULT_PAUSE_MS: u64 = 1_000;
    pub const DEFAULT_REPETITIONS_PER_CLASS: u32 = 2;
    pub const MAX_REPETITIONS_PER_CLASS: u32 = 1_000;
    /// Upper bound for any single prepare, record or pause phase
    pub const MAX_PHASE_MS: u64 = 600_000;
}

/// Export constants
pub mod export {
    pub const DEFAULT_OUTPUT_DIR: &str = "data";
    pub const DEFAULT_FILE_PREFIX: &str = "session";
}

/// Configuration file discovery
pub mod paths {
    pub const CONFIG_FILE_NAME: &str = "emg-capture.toml";
    pub const SYSTEM_CONFIG_DIR: &str = "/etc/emg-capture";
    /// Environment override prefix, keys separated by `__`
    pub const ENV_PREFIX: &str = "EMG_CAPTURE__";
    pub const ENV_SEPARATOR: &str = "__";
}
