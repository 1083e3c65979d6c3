pub mod config;
pub use config::{AppConfigImpl, ServerConfig};

pub mod crypto;
pub use crypto::WeapiEncryptor;

pub mod http;
pub use http::HttpClient;

pub mod provider;
pub use provider::build_registry;
