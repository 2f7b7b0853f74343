//! System-wide configuration constants

/// Serial link constants
pub mod serial {
    pub const DEFAULT_PORT_NAME: &str = "/dev/ttyACM0";
    pub const DEFAULT_BAUD_RATE: u32 = 115_200;
    pub const MAX_BAUD_RATE: u32 = 4_000_000;
    pub const DEFAULT_READ_TIMEOUT_MS: u32 = 100;
    pub const MAX_READ_TIMEOUT_MS: u32 = 5_000;
    pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;
    pub const MIN_READ_BUFFER_SIZE: usize = 64;
}

/// Acquisition thread constants
pub mod acquisition {
    /// Upper bound `stop()` waits for the read thread
    pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 1_000;
    /// A line longer than this without a newline is garbage
    pub const MAX_LINE_BYTES: usize = 256;
    /// Pause after end-of-stream before polling again
    pub const IDLE_SLEEP_MS: u64 = 5;
    /// Pause after an unexpected I/O error
    pub const ERROR_BACKOFF_MS: u64 = 20;
    pub const READER_THREAD_NAME: &str = "glove-reader";
}

/// Calibration constants
pub mod calibration {
    pub const DEFAULT_PHASE_DURATION_S: f64 = 3.0;
    pub const DEFAULT_TICK_RATE_HZ: f64 = 60.0;
    pub const DEFAULT_PROFILE_PATH: &str = "calibration.txt";

    pub const DEFAULT_FLEX_MIN: f64 = 200.0;
    pub const DEFAULT_FLEX_MAX: f64 = 800.0;
    pub const DEFAULT_FSR_MIN: f64 = 50.0;
    pub const DEFAULT_FSR_MAX: f64 = 900.0;

    /// Threshold used for any detection threshold left unset
    pub const DEFAULT_DETECTION_THRESHOLD: f64 = 0.6;
}

/// Event detection constants
pub mod detection {
    pub const DEFAULT_GAME_TICK_RATE_HZ: f64 = 60.0;
    pub const DEFAULT_FOLLOW_UP_TICK_RATE_HZ: f64 = 30.0;

    pub const DEFAULT_PRESS_THRESHOLD: f64 = 0.6;
    pub const DEFAULT_SYNC_WINDOW_S: f64 = 0.20;
    pub const DEFAULT_COOLDOWN_S: f64 = 0.25;

    /// Uncalibrated pressure range
    pub const FALLBACK_FSR_MIN: f64 = 100.0;
    pub const FALLBACK_FSR_MAX: f64 = 900.0;
    /// Uncalibrated flexion range
    pub const FALLBACK_FLEX_MIN: f64 = 300.0;
    pub const FALLBACK_FLEX_MAX: f64 = 800.0;
    /// Uncalibrated follow-up graphs plot the raw ADC scale
    pub const DISPLAY_FALLBACK_MIN: f64 = 0.0;
    pub const DISPLAY_FALLBACK_MAX: f64 = 1023.0;

    pub const DEFAULT_TURN_WINDOW_S: f64 = 2.0;
    pub const DEFAULT_SEQUENCE_LENGTH: usize = 8;
    pub const DEFAULT_CUE_PERIOD_S: f64 = 5.0;
    pub const DEFAULT_CUE_BLINK_HZ: f64 = 2.0;

    pub const DEFAULT_STEERING_SENSITIVITY_DEG_S: f64 = 45.0;
    pub const DEFAULT_STEERING_SMOOTHING: f64 = 0.3;

    pub const DEFAULT_FOLLOW_UP_WINDOW_S: f64 = 10.0;
}

/// Simulator constants
pub mod simulation {
    pub const DEFAULT_FRAME_RATE_HZ: u32 = 100;
    pub const DEFAULT_NOISE_COUNTS: f64 = 4.0;

    pub const ADC_MAX: f64 = 1023.0;
    pub const FLEX_OPEN: f64 = 250.0;
    pub const FLEX_CLOSED: f64 = 760.0;
    pub const FSR_RELEASED: f64 = 80.0;
    pub const FSR_PRESSED: f64 = 860.0;
    pub const GRAVITY_MS2: f64 = 9.81;

    pub const CSV_HEADER: &str = "t_ms,flex_thumb,flex_index,fsr_thumb,fsr_index,ax,ay,az,gx,gy,gz";
}

/// Configuration file locations
pub mod paths {
    pub const SYSTEM_CONFIG_PATH: &str = "/etc/glove-core/config.toml";
    pub const USER_CONFIG_DIR: &str = ".config/glove-core";
    pub const DEFAULT_CONFIG_FILE: &str = "glove.toml";
    pub const LOCAL_CONFIG_FILE: &str = "glove.local.toml";
    pub const ENV_PREFIX: &str = "GLOVE_";
}
