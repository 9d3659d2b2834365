pub mod config;
pub mod error;
pub mod factory;
pub mod fetch_cache;
pub mod providers;
pub mod traits;
pub mod types;

mod wire;

pub use config::*;
pub use error::ProviderError;
pub use factory::*;
pub use fetch_cache::FetchCache;
pub use providers::*;
pub use traits::*;
pub use types::*;
