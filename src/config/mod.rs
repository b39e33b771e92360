//! Configuration management for place-keeper
//!
//! Settings come from three layers, later ones winning:
//! - **file**: TOML at `<config_dir>/place-keeper/config.toml` (or `--config`)
//! - **env**: `PLACE_KEEPER_*` variables
//! - **cli**: flags and positionals applied in `main`

pub mod settings;

pub use settings::Settings;
