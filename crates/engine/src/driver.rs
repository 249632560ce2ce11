use std::sync::Arc;

use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, Utc};
use tracing::{debug, error, info, warn};

use recur_core::config::EngineConfig;
use recur_core::{EngineError, EngineResult};
use recur_domain::entities::{SeriesState, Task};
use recur_domain::events::TaskCompleted;
use recur_domain::repositories::TaskRepository;
use recur_domain::services::{SweepOutcome, SweepService};

use crate::generator::{Generation, InstanceGenerator};

/// 循环任务扫描驱动：决定何时调用实例生成。
///
/// 周期扫描和完成触发两条路径可能并发执行（扫描tick与用户完成任务同时发生），
/// 不需要进程内锁——幂等保护在存储层唯一约束上。
pub struct RecurrenceSweeper {
    task_repo: Arc<dyn TaskRepository>,
    generator: InstanceGenerator,
    tz_offset: FixedOffset,
}

impl RecurrenceSweeper {
    pub fn new(task_repo: Arc<dyn TaskRepository>, config: &EngineConfig) -> Self {
        let tz_offset = config.fixed_offset();
        let generator = InstanceGenerator::new(task_repo.clone(), tz_offset);
        Self {
            task_repo,
            generator,
            tz_offset,
        }
    }

    /// 用户时区下的"今天"，决定扫描的到期门限
    fn local_today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz_offset).date_naive()
    }

    /// 解析完成事件对应的序列父任务：
    /// 实例沿recurring_parent_id回溯，父任务自身完成时就是它自己
    async fn resolve_series_parent(&self, task: &Task) -> EngineResult<Task> {
        match task.recurring_parent_id {
            Some(parent_id) => self
                .task_repo
                .get_by_id(parent_id)
                .await?
                .ok_or(EngineError::TaskNotFound { id: parent_id }),
            None => Ok(task.clone()),
        }
    }
}

#[async_trait]
impl SweepService for RecurrenceSweeper {
    /// 扫描所有活跃循环父任务。单个父任务的生成互相独立，
    /// 一个序列失败绝不中断整批扫描。
    async fn sweep_once(&self) -> EngineResult<SweepOutcome> {
        let span = tracing::info_span!("sweep_once");
        let _guard = span.enter();
        let start_time = std::time::Instant::now();

        let today = self.local_today();
        info!("开始扫描活跃循环任务, 今天: {}", today);

        let parents = self.task_repo.get_active_recurring().await?;
        let mut outcome = SweepOutcome {
            scanned: parents.len(),
            ..SweepOutcome::default()
        };

        for parent in parents {
            match self.generator.maybe_generate_next(&parent, today).await {
                Ok(Generation::Created(instance)) => {
                    info!(
                        "扫描生成: {} -> 到期日 {:?}",
                        parent.entity_description(),
                        instance.due_date
                    );
                    outcome.generated.push(instance);
                }
                Ok(Generation::SeriesEnded) => {
                    outcome.ended += 1;
                }
                Ok(Generation::AlreadyExists)
                | Ok(Generation::NotDue)
                | Ok(Generation::Skipped) => {}
                Err(EngineError::InvalidRule { reason }) => {
                    // 序列已被生成器标记为INVALID，等待用户修正
                    warn!(
                        "{} 的循环规则无法继续: {}，请检查规则配置",
                        parent.entity_description(),
                        reason
                    );
                    outcome.failed += 1;
                }
                Err(e) => {
                    error!(
                        "{} 生成失败: {}，继续处理其余任务",
                        parent.entity_description(),
                        e
                    );
                    outcome.failed += 1;
                }
            }
        }

        let duration = start_time.elapsed();
        info!(
            "本次扫描完成: 共 {} 个序列, 生成 {} 个实例, 终止 {} 个, 失败 {} 个, 耗时 {:?}",
            outcome.scanned,
            outcome.generated.len(),
            outcome.ended,
            outcome.failed,
            duration
        );

        Ok(outcome)
    }

    /// 完成触发路径：completion_based序列在实例被标记完成时立即生成下一个，
    /// 不等下一个扫描tick。schedule-based序列忽略完成事件。
    async fn handle_completion(&self, event: &TaskCompleted) -> EngineResult<Option<Task>> {
        let task = self
            .task_repo
            .get_by_id(event.task_id)
            .await?
            .ok_or(EngineError::TaskNotFound { id: event.task_id })?;

        let parent = self.resolve_series_parent(&task).await?;

        let Some(rule) = parent.recurrence.as_ref() else {
            return Ok(None);
        };
        if rule.is_none() || parent.series_state != SeriesState::Active {
            return Ok(None);
        }
        if !rule.completion_based {
            debug!(
                "父任务 {} 为固定节奏序列，完成事件交由周期扫描处理",
                parent.id
            );
            return Ok(None);
        }

        let anchor = self.generator.completion_anchor(event.completed_at);
        info!(
            "完成事件触发生成: 任务 {} 完成于 {}, 锚点 {}",
            event.task_id, event.completed_at, anchor
        );

        let generation = self
            .generator
            .generate_for_completion(&parent, anchor)
            .await?;
        Ok(generation.into_task())
    }
}
