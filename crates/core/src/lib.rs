//! 循环任务引擎基础crate：统一错误类型与配置模型

pub mod config;
pub mod errors;

pub use config::{AppConfig, ConfigValidator, DatabaseConfig, EngineConfig};
pub use errors::{EngineError, EngineResult};
