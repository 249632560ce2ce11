use chrono::NaiveDate;
use thiserror::Error;

/// 循环任务引擎统一错误类型
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库操作错误: {0}")]
    DatabaseOperation(String),

    #[error("任务未找到: {id}")]
    TaskNotFound { id: i64 },

    #[error("无效的循环规则: {reason}")]
    InvalidRule { reason: String },

    #[error("重复的任务实例: 父任务 {parent_id} 在 {due_date} 的实例已存在")]
    DuplicateOccurrence { parent_id: i64, due_date: NaiveDate },

    #[error("存储暂时不可用: {0}")]
    StoreUnavailable(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn database_error(message: impl Into<String>) -> Self {
        EngineError::DatabaseOperation(message.into())
    }
}

/// 统一的Result类型
pub type EngineResult<T> = std::result::Result<T, EngineError>;
