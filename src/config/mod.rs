//! Configuration: user settings loaded from `config.toml`.

pub mod settings;

pub use settings::{default_home, Settings};
