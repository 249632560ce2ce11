use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};
use tracing::{debug, info, warn};

use recur_core::{EngineError, EngineResult};
use recur_domain::entities::{RecurrenceRule, SeriesState, Task};
use recur_domain::repositories::TaskRepository;

use crate::calculator::OccurrenceCalculator;

/// 单次生成尝试的结果
#[derive(Debug)]
pub enum Generation {
    /// 成功插入一个新实例
    Created(Task),
    /// 并发调用方已经生成了同一发生日的实例，本次为幂等空操作
    AlreadyExists,
    /// 候选发生日尚未到期，本轮不生成
    NotDue,
    /// 序列已终止（end_date已过），父任务被标记为ENDED
    SeriesEnded,
    /// 父任务不参与生成（无规则、type为none或序列非ACTIVE）
    Skipped,
}

impl Generation {
    pub fn into_task(self) -> Option<Task> {
        match self {
            Generation::Created(task) => Some(task),
            _ => None,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Generation::Created(_))
    }
}

/// 实例生成器：判断序列当前是否需要新实例，需要时恰好创建一个。
///
/// 并发正确性完全委托给存储层在(recurring_parent_id, due_date)上的
/// 唯一约束：并发插入只有一个成功，落败方收到DuplicateOccurrence并视为成功。
pub struct InstanceGenerator {
    task_repo: Arc<dyn TaskRepository>,
    /// 用户时区偏移，用于把完成时间戳折算成日历日
    tz_offset: FixedOffset,
}

impl InstanceGenerator {
    pub fn new(task_repo: Arc<dyn TaskRepository>, tz_offset: FixedOffset) -> Self {
        Self {
            task_repo,
            tz_offset,
        }
    }

    /// 周期扫描路径：推导锚点，计算候选发生日，到期（<= today）时生成。
    ///
    /// completion_based序列的最新实例尚未完成时不做任何事，
    /// 该迁移由完成钩子负责。
    pub async fn maybe_generate_next(
        &self,
        parent: &Task,
        today: NaiveDate,
    ) -> EngineResult<Generation> {
        let Some(rule) = self.active_rule(parent) else {
            return Ok(Generation::Skipped);
        };

        let calculator = self.build_calculator(parent, &rule).await?;

        let Some(anchor) = self.resolve_sweep_anchor(parent, &rule).await? else {
            debug!("父任务 {} 暂无可用锚点，跳过本轮生成", parent.id);
            return Ok(Generation::Skipped);
        };

        let Some(next) = calculator.next_occurrence(anchor) else {
            return self.mark_series_ended(parent).await;
        };

        if next > today {
            debug!(
                "父任务 {} 的下一个发生日 {} 尚未到期（今天 {}）",
                parent.id, next, today
            );
            return Ok(Generation::NotDue);
        }

        self.insert_instance(parent, next).await
    }

    /// 完成触发路径：以完成时刻所在日历日为锚点立即生成下一个实例。
    /// 到期日允许在未来，不做today门限。
    pub async fn generate_for_completion(
        &self,
        parent: &Task,
        anchor: NaiveDate,
    ) -> EngineResult<Generation> {
        let Some(rule) = self.active_rule(parent) else {
            return Ok(Generation::Skipped);
        };

        let calculator = self.build_calculator(parent, &rule).await?;

        let Some(next) = calculator.next_occurrence(anchor) else {
            return self.mark_series_ended(parent).await;
        };

        self.insert_instance(parent, next).await
    }

    /// 把完成时间戳折算成用户时区下的日历日
    pub fn completion_anchor(&self, completed_at: chrono::DateTime<chrono::Utc>) -> NaiveDate {
        completed_at.with_timezone(&self.tz_offset).date_naive()
    }

    fn active_rule(&self, parent: &Task) -> Option<RecurrenceRule> {
        let rule = parent.recurrence.as_ref()?;
        if rule.is_none() {
            return None;
        }
        if parent.series_state != SeriesState::Active {
            debug!(
                "父任务 {} 的序列状态为 {:?}，不参与生成",
                parent.id, parent.series_state
            );
            return None;
        }
        Some(rule.clone())
    }

    /// 规则校验失败时把序列标记为INVALID并上抛，由外部层提示用户修正；
    /// 绝不无限重试。
    ///
    /// 规则缺少series_start时用父任务的到期日/创建日补充周纪元，
    /// 这两者在序列生命周期内不变，interval > 1的weekly节奏才不会
    /// 被逐次生成重新归零。
    async fn build_calculator(
        &self,
        parent: &Task,
        rule: &RecurrenceRule,
    ) -> EngineResult<OccurrenceCalculator> {
        let epoch = parent
            .due_date
            .unwrap_or_else(|| parent.created_date(self.tz_offset));
        match OccurrenceCalculator::with_epoch(rule, epoch) {
            Ok(calculator) => Ok(calculator),
            Err(e) => {
                warn!(
                    "父任务 {} 的循环规则无效: {}，序列转入INVALID",
                    parent.id, e
                );
                self.task_repo
                    .update_series_state(parent.id, SeriesState::Invalid)
                    .await?;
                Err(e)
            }
        }
    }

    /// 扫描路径的锚点：最近实例的到期日（schedule-based）或完成日
    /// （completion-based）；序列还没有实例时用父任务自身的到期日/创建日。
    async fn resolve_sweep_anchor(
        &self,
        parent: &Task,
        rule: &RecurrenceRule,
    ) -> EngineResult<Option<NaiveDate>> {
        match self.task_repo.get_latest_instance(parent.id).await? {
            Some(latest) => {
                if rule.completion_based {
                    match latest.completed_at {
                        Some(completed_at) => Ok(Some(self.completion_anchor(completed_at))),
                        // 浮动节奏：上一个实例还开着，下一个要等它完成
                        None => Ok(None),
                    }
                } else {
                    match latest.due_date {
                        Some(due) => Ok(Some(due)),
                        None => Ok(Some(latest.created_date(self.tz_offset))),
                    }
                }
            }
            None => Ok(Some(
                parent
                    .due_date
                    .unwrap_or_else(|| parent.created_date(self.tz_offset)),
            )),
        }
    }

    async fn mark_series_ended(&self, parent: &Task) -> EngineResult<Generation> {
        self.task_repo
            .update_series_state(parent.id, SeriesState::Ended)
            .await?;
        info!("父任务 {} 的循环序列已到达终止日期，转入ENDED", parent.id);
        Ok(Generation::SeriesEnded)
    }

    async fn insert_instance(&self, parent: &Task, due: NaiveDate) -> EngineResult<Generation> {
        let instance = Task::instance_of(parent, due);
        match self.task_repo.create_instance(&instance).await {
            Ok(created) => {
                info!(
                    "为父任务 {} 生成了 {} 的实例 {}",
                    parent.id, due, created.id
                );
                Ok(Generation::Created(created))
            }
            Err(EngineError::DuplicateOccurrence { .. }) => {
                // 并发调用方赢得了插入竞赛，幂等空操作
                debug!("父任务 {} 在 {} 的实例已由并发调用生成", parent.id, due);
                Ok(Generation::AlreadyExists)
            }
            Err(e) => Err(e),
        }
    }
}
