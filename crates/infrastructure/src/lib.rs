//! 存储基础设施: SQLite/PostgreSQL 任务仓库实现与错误上下文工具

pub mod database;
pub mod error_handling;

pub use database::*;
