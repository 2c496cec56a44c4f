//! Configuration loading for the switchboard server.
//!
//! A single `switchboard.toml` discovered in the working directory (or
//! pointed at explicitly), with `${VAR}` environment substitution applied
//! to the raw text before parsing so secrets stay out of the file.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{discover_and_load, load_config},
    schema::{
        AppConfig, DatabaseConfig, EvolutionConfig, MetaConfig, ServerConfig, SwitchboardConfig,
        TelegramConfig,
    },
};
