//! # API Keypool Library
//!
//! 密钥池核心库：密钥解析、远程验证与请求头规则解析

pub mod channel;
pub mod config;
pub mod database;
pub mod error;
pub mod key_pool;
pub mod logging;
pub mod utils;

// Re-export commonly used types
pub use config::{EffectiveConfig, SystemSettingsManager};
pub use error::{ProxyError, Result};
pub use key_pool::{KeyParser, KeyValidator};
