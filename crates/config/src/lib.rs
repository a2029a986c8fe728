//! Configuration loading for the pairgate gateway.
//!
//! Config files are discovered in the working directory first, then in
//! `~/.config/pairgate/`. `${ENV_VAR}` placeholders are substituted before
//! parsing, so secrets can stay out of the file.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{
        HMAC_SECRET_ENV, clear_config_dir, config_dir, discover_and_load, load_config,
        set_config_dir,
    },
    schema::{
        AuthConfig, BridgeConfig, PairgateConfig, ReconnectConfig, ServerConfig, SessionConfig,
    },
};
