use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 任务完成事件，由外部任务完成API发出。
/// completion_based规则依赖它立即触发下一个实例的生成。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskCompleted {
    pub task_id: i64,
    pub completed_at: DateTime<Utc>,
}

impl TaskCompleted {
    pub fn new(task_id: i64, completed_at: DateTime<Utc>) -> Self {
        Self {
            task_id,
            completed_at,
        }
    }
}
