pub mod config;
pub mod constants;
pub mod runtime_config;
pub mod spawner;

pub use config::FeedConfig;
pub use runtime_config::RuntimeConfig;
pub use spawner::Spawner;
