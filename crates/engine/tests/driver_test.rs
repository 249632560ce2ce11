#[cfg(test)]
mod driver_tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, TimeZone, Utc};
    use recur_core::config::EngineConfig;
    use recur_domain::entities::{SeriesState, TaskStatus};
    use recur_domain::events::TaskCompleted;
    use recur_domain::services::SweepService;
    use recur_engine::RecurrenceSweeper;
    use recur_testing_utils::{MockTaskRepository, RecurrenceRuleBuilder, TaskBuilder};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn engine_config() -> EngineConfig {
        EngineConfig {
            enabled: true,
            sweep_interval_seconds: 300,
            timezone_offset_minutes: 0,
        }
    }

    fn sweeper_with(repo: Arc<MockTaskRepository>) -> RecurrenceSweeper {
        RecurrenceSweeper::new(repo, &engine_config())
    }

    #[tokio::test]
    async fn test_sweep_generates_for_overdue_parents() {
        // 到期日远在过去的父任务在扫描时生成一个实例
        let parent = TaskBuilder::new()
            .with_id(1)
            .with_due_date(date(2020, 1, 1))
            .with_recurrence(RecurrenceRuleBuilder::daily().build())
            .build();
        let repo = Arc::new(MockTaskRepository::with_tasks(vec![parent]));
        let sweeper = sweeper_with(repo.clone());

        let outcome = sweeper.sweep_once().await.unwrap();

        assert_eq!(outcome.scanned, 1);
        assert_eq!(outcome.generated.len(), 1);
        assert_eq!(outcome.failed, 0);
        assert_eq!(repo.instances_of(1).len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_generates_at_most_one_per_parent() {
        // 多个周期被错过时每轮只补一个实例，不追赶整个积压
        let parent = TaskBuilder::new()
            .with_id(1)
            .with_due_date(date(2020, 1, 1))
            .with_recurrence(RecurrenceRuleBuilder::daily().build())
            .build();
        let repo = Arc::new(MockTaskRepository::with_tasks(vec![parent]));
        let sweeper = sweeper_with(repo.clone());

        sweeper.sweep_once().await.unwrap();
        assert_eq!(repo.instances_of(1).len(), 1);

        sweeper.sweep_once().await.unwrap();
        assert_eq!(repo.instances_of(1).len(), 2);
    }

    #[tokio::test]
    async fn test_sweep_isolates_per_series_failures() {
        let broken = TaskBuilder::new()
            .with_id(1)
            .with_due_date(date(2020, 1, 1))
            .with_recurrence(RecurrenceRuleBuilder::daily().build())
            .build();
        let healthy = TaskBuilder::new()
            .with_id(2)
            .with_due_date(date(2020, 1, 1))
            .with_recurrence(RecurrenceRuleBuilder::daily().build())
            .build();
        let repo = Arc::new(MockTaskRepository::with_tasks(vec![broken, healthy]));
        repo.fail_reads_for(1);
        let sweeper = sweeper_with(repo.clone());

        let outcome = sweeper.sweep_once().await.unwrap();

        // 一个序列失败绝不中断整批扫描
        assert_eq!(outcome.scanned, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.generated.len(), 1);
        assert!(repo.instances_of(1).is_empty());
        assert_eq!(repo.instances_of(2).len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_counts_invalid_rules_as_failed() {
        let invalid = TaskBuilder::new()
            .with_id(1)
            .with_due_date(date(2020, 1, 1))
            .with_recurrence(RecurrenceRuleBuilder::weekly(vec![9]).build())
            .build();
        let repo = Arc::new(MockTaskRepository::with_tasks(vec![invalid]));
        let sweeper = sweeper_with(repo.clone());

        let outcome = sweeper.sweep_once().await.unwrap();

        assert_eq!(outcome.failed, 1);
        let stored = repo.all_tasks().into_iter().find(|t| t.id == 1).unwrap();
        assert_eq!(stored.series_state, SeriesState::Invalid);
    }

    #[tokio::test]
    async fn test_completion_hook_resolves_parent_from_instance() {
        let completed_at = Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap();
        let parent = TaskBuilder::new()
            .with_id(1)
            .with_due_date(date(2024, 1, 1))
            .with_recurrence(
                RecurrenceRuleBuilder::daily()
                    .with_interval(2)
                    .completion_based()
                    .build(),
            )
            .build();
        let instance = TaskBuilder::new()
            .with_id(2)
            .with_recurring_parent_id(1)
            .with_due_date(date(2024, 1, 2))
            .with_status(TaskStatus::Done)
            .with_completed_at(completed_at)
            .build();
        let repo = Arc::new(MockTaskRepository::with_tasks(vec![parent, instance]));
        let sweeper = sweeper_with(repo.clone());

        let event = TaskCompleted::new(2, completed_at);
        let generated = sweeper.handle_completion(&event).await.unwrap();

        let new_instance = generated.unwrap();
        // 从完成日01-05推2天
        assert_eq!(new_instance.due_date, Some(date(2024, 1, 7)));
        assert_eq!(new_instance.recurring_parent_id, Some(1));
    }

    #[tokio::test]
    async fn test_completion_hook_ignores_schedule_based_series() {
        let completed_at = Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap();
        let parent = TaskBuilder::new()
            .with_id(1)
            .with_due_date(date(2024, 1, 1))
            .with_recurrence(RecurrenceRuleBuilder::daily().build())
            .build();
        let instance = TaskBuilder::new()
            .with_id(2)
            .with_recurring_parent_id(1)
            .with_due_date(date(2024, 1, 2))
            .with_status(TaskStatus::Done)
            .with_completed_at(completed_at)
            .build();
        let repo = Arc::new(MockTaskRepository::with_tasks(vec![parent, instance]));
        let sweeper = sweeper_with(repo.clone());

        let event = TaskCompleted::new(2, completed_at);
        let generated = sweeper.handle_completion(&event).await.unwrap();

        // 固定节奏序列由周期扫描负责，完成事件是空操作
        assert!(generated.is_none());
        assert_eq!(repo.instances_of(1).len(), 1);
    }

    #[tokio::test]
    async fn test_completion_hook_ignores_non_recurring_task() {
        let completed_at = Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap();
        let plain = TaskBuilder::new().with_id(1).build();
        let repo = Arc::new(MockTaskRepository::with_tasks(vec![plain]));
        let sweeper = sweeper_with(repo.clone());

        let event = TaskCompleted::new(1, completed_at);
        let generated = sweeper.handle_completion(&event).await.unwrap();

        assert!(generated.is_none());
        assert_eq!(repo.count(), 1);
    }

    #[tokio::test]
    async fn test_completion_hook_ignores_inactive_series() {
        let completed_at = Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap();
        let parent = TaskBuilder::new()
            .with_id(1)
            .with_due_date(date(2024, 1, 1))
            .with_recurrence(RecurrenceRuleBuilder::daily().completion_based().build())
            .with_series_state(SeriesState::Ended)
            .build();
        let repo = Arc::new(MockTaskRepository::with_tasks(vec![parent]));
        let sweeper = sweeper_with(repo.clone());

        let event = TaskCompleted::new(1, completed_at);
        let generated = sweeper.handle_completion(&event).await.unwrap();

        assert!(generated.is_none());
    }

    #[tokio::test]
    async fn test_completion_hook_unknown_task_errors() {
        let repo = Arc::new(MockTaskRepository::new());
        let sweeper = sweeper_with(repo);

        let event = TaskCompleted::new(99, Utc::now());
        assert!(sweeper.handle_completion(&event).await.is_err());
    }

    #[tokio::test]
    async fn test_sweep_skips_ended_and_invalid_series() {
        let ended = TaskBuilder::new()
            .with_id(1)
            .with_due_date(date(2020, 1, 1))
            .with_recurrence(RecurrenceRuleBuilder::daily().build())
            .with_series_state(SeriesState::Ended)
            .build();
        let invalid = TaskBuilder::new()
            .with_id(2)
            .with_due_date(date(2020, 1, 1))
            .with_recurrence(RecurrenceRuleBuilder::daily().build())
            .with_series_state(SeriesState::Invalid)
            .build();
        let repo = Arc::new(MockTaskRepository::with_tasks(vec![ended, invalid]));
        let sweeper = sweeper_with(repo.clone());

        let outcome = sweeper.sweep_once().await.unwrap();

        // 非ACTIVE序列不进入扫描集合
        assert_eq!(outcome.scanned, 0);
        assert_eq!(repo.count(), 2);
    }
}
