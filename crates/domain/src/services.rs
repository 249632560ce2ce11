//! 引擎对外的服务抽象

use async_trait::async_trait;
use recur_core::EngineResult;

use crate::entities::Task;
use crate::events::TaskCompleted;

/// 单次扫描的汇总结果
#[derive(Debug, Default)]
pub struct SweepOutcome {
    /// 本次扫描覆盖的活跃父任务数
    pub scanned: usize,
    /// 本次扫描生成的实例
    pub generated: Vec<Task>,
    /// 本次扫描中终止（ENDED）的序列数
    pub ended: usize,
    /// 失败但被隔离的父任务数，单个失败不会中断整批
    pub failed: usize,
}

/// 循环任务引擎的两条触发路径：周期扫描与完成触发。
/// 两条路径语义一致，幂等保护使到达顺序无关紧要。
#[async_trait]
pub trait SweepService: Send + Sync {
    /// 扫描所有活跃循环父任务并为到期者生成实例
    async fn sweep_once(&self) -> EngineResult<SweepOutcome>;

    /// 任务完成钩子：completion_based规则立即以完成时刻为锚点生成下一个实例
    async fn handle_completion(&self, event: &TaskCompleted) -> EngineResult<Option<Task>>;
}
