pub mod common;
pub mod config;

pub use config::ToolConfig;
pub use tile_dataset;

/// Initialise `env_logger` with an `info` default; `RUST_LOG` overrides it.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
