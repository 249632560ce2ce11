//! 领域仓储抽象
//!
//! 定义数据访问的抽象接口，遵循依赖倒置原则

use async_trait::async_trait;
use recur_core::EngineResult;

use crate::entities::{SeriesState, Task};

/// 任务仓储抽象。
///
/// create_instance是引擎唯一的并发正确性机制所在：实现必须依赖存储层
/// 在(recurring_parent_id, due_date)上的唯一约束，并把唯一约束冲突映射为
/// EngineError::DuplicateOccurrence。应用层"先查再插"不足以防止竞态。
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, task: &Task) -> EngineResult<Task>;
    async fn get_by_id(&self, id: i64) -> EngineResult<Option<Task>>;
    async fn update(&self, task: &Task) -> EngineResult<()>;
    async fn delete(&self, id: i64) -> EngineResult<bool>;

    /// 周期扫描的候选集：规则类型非none且序列状态为ACTIVE的父任务
    async fn get_active_recurring(&self) -> EngineResult<Vec<Task>>;

    /// 指定父任务最近生成的实例（按到期日最新）
    async fn get_latest_instance(&self, parent_id: i64) -> EngineResult<Option<Task>>;

    /// 插入一个生成的实例；命中唯一约束时返回DuplicateOccurrence
    async fn create_instance(&self, instance: &Task) -> EngineResult<Task>;

    /// 序列状态迁移（ACTIVE -> ENDED / INVALID）
    async fn update_series_state(&self, task_id: i64, state: SeriesState) -> EngineResult<()>;
}
