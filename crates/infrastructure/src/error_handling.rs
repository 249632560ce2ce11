//! Enhanced error handling for repository operations with rich context
//!
//! Context-rich error helpers for repository operations, including entity
//! information, operation context, and structured logging.

use chrono::{DateTime, Utc};
use recur_core::EngineError;
use sqlx::Error as SqlxError;
use std::fmt;
use tracing::{error, info, instrument};

/// Operation context for repository operations
#[derive(Debug, Clone)]
pub enum RepositoryOperation {
    Create,
    Read,
    Update,
    Delete,
    Query,
    Migrate,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryOperation::Create => write!(f, "创建"),
            RepositoryOperation::Read => write!(f, "查询"),
            RepositoryOperation::Update => write!(f, "更新"),
            RepositoryOperation::Delete => write!(f, "删除"),
            RepositoryOperation::Query => write!(f, "查询"),
            RepositoryOperation::Migrate => write!(f, "迁移"),
        }
    }
}

/// Context information for task repository operations
#[derive(Debug, Clone)]
pub struct TaskOperationContext {
    pub operation: RepositoryOperation,
    pub task_id: Option<i64>,
    pub task_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub additional_info: Option<String>,
}

impl TaskOperationContext {
    pub fn new(operation: RepositoryOperation) -> Self {
        Self {
            operation,
            task_id: None,
            task_name: None,
            timestamp: Utc::now(),
            additional_info: None,
        }
    }

    pub fn with_task_id(mut self, task_id: i64) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn with_task_name(mut self, task_name: String) -> Self {
        self.task_name = Some(task_name);
        self
    }

    pub fn with_additional_info(mut self, info: String) -> Self {
        self.additional_info = Some(info);
        self
    }

    pub fn entity_description(&self) -> String {
        match (&self.task_id, &self.task_name) {
            (Some(id), Some(name)) => format!("任务 '{}' (ID: {})", name, id),
            (Some(id), None) => format!("任务 (ID: {})", id),
            (None, Some(name)) => format!("任务 '{}'", name),
            (None, None) => "任务".to_string(),
        }
    }
}

/// Enhanced error helpers for repository operations
pub struct RepositoryErrorHelpers;

impl RepositoryErrorHelpers {
    /// Create a database error with task context
    #[instrument(skip_all, fields(
        operation = %context.operation,
        task_id = ?context.task_id,
        task_name = ?context.task_name,
        timestamp = %context.timestamp,
    ))]
    pub fn task_database_error(context: TaskOperationContext, error: SqlxError) -> EngineError {
        let entity_desc = context.entity_description();
        let operation_desc = context.operation.to_string();

        let error_msg = match &error {
            SqlxError::Database(ref db_error) => {
                if let Some(constraint) = db_error.constraint() {
                    format!(
                        "{}{}时发生数据库约束冲突: {}",
                        operation_desc, entity_desc, constraint
                    )
                } else {
                    format!(
                        "{}{}时发生数据库错误: {}",
                        operation_desc, entity_desc, db_error
                    )
                }
            }
            SqlxError::PoolClosed => {
                let msg = format!("{}{}时数据库连接池已关闭", operation_desc, entity_desc);
                error!(error = %error, "{}", msg);
                return EngineError::StoreUnavailable(msg);
            }
            SqlxError::PoolTimedOut => {
                let msg = format!("{}{}时数据库连接池超时", operation_desc, entity_desc);
                error!(error = %error, "{}", msg);
                return EngineError::StoreUnavailable(msg);
            }
            SqlxError::Io(ref io_error) => {
                format!(
                    "{}{}时发生I/O错误: {}",
                    operation_desc, entity_desc, io_error
                )
            }
            _ => {
                format!(
                    "{}{}时发生未知数据库错误: {}",
                    operation_desc, entity_desc, error
                )
            }
        };

        error!(error = %error, "{}", error_msg);
        EngineError::database_error(error_msg)
    }

    /// Create a task-not-found error with context
    pub fn task_not_found(context: TaskOperationContext) -> EngineError {
        let error_msg = format!(
            "{}{}失败: 任务不存在",
            context.operation,
            context.entity_description()
        );
        error!("{}", error_msg);
        EngineError::TaskNotFound {
            id: context.task_id.unwrap_or(-1),
        }
    }

    /// Create a serialization error with task context
    pub fn task_serialization_error(
        context: TaskOperationContext,
        error: impl fmt::Display,
    ) -> EngineError {
        let error_msg = format!(
            "{}{}时序列化失败: {}",
            context.operation,
            context.entity_description(),
            error
        );
        error!("{}", error_msg);
        EngineError::Serialization(error_msg)
    }

    /// Log a successful repository operation
    pub fn log_operation_success(
        context: TaskOperationContext,
        entity_description: &str,
        details: Option<&str>,
    ) {
        match details {
            Some(details) => {
                info!("{}{}成功: {}", context.operation, entity_description, details)
            }
            None => info!("{}{}成功", context.operation, entity_description),
        }
    }
}

/// Macro for creating task operation context easily
#[macro_export]
macro_rules! task_context {
    ($operation:expr) => {
        $crate::error_handling::TaskOperationContext::new($operation)
    };
    ($operation:expr, task_id = $task_id:expr) => {
        $crate::error_handling::TaskOperationContext::new($operation).with_task_id($task_id)
    };
    ($operation:expr, task_name = $task_name:expr) => {
        $crate::error_handling::TaskOperationContext::new($operation)
            .with_task_name($task_name.to_string())
    };
    ($operation:expr, task_id = $task_id:expr, task_name = $task_name:expr) => {
        $crate::error_handling::TaskOperationContext::new($operation)
            .with_task_id($task_id)
            .with_task_name($task_name.to_string())
    };
}
