mod config;
mod engine;
mod randomization;
mod shutdown;
mod state;
mod venue;

pub use config::{
    ExponentialBackoff, VolumeConfig, VolumeSettings, DEFAULT_MAX_UNFILLED_RETRIES,
    INITIAL_BALANCE_ENV, MAX_ITERATIONS_ENV, MAX_UNFILLED_RETRIES_ENV, RANDOMIZATION_LEVEL_ENV,
    TOKEN_ENV,
};
pub use engine::{LoopReport, StopReason, VolumeLoop};
pub use randomization::{random_quantity, random_sleep, Preset, RandomizationLevel};
pub use shutdown::spawn_signal_listener;
pub use state::{LoopState, BALANCE_DECAY};
pub use venue::OrderVenue;
