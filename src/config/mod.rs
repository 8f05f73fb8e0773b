//! Configuration layers
//!
//! Settings are merged from, in increasing precedence:
//! 1. Built-in defaults
//! 2. User config (~/.config/rapidcompact/config.toml)
//! 3. Explicit `--config` file
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;

pub use defaults::{HttpSettings, PollSettings, Settings};
pub use effective::{
    default_user_config_path, ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig,
};
pub use merge::{deep_merge, merge_layers};
