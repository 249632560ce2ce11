//! Test data builders for creating test entities
//!
//! Builder patterns for creating test data with sensible defaults and
//! easy customization.

use chrono::{DateTime, NaiveDate, Utc};
use recur_domain::entities::{
    RecurrenceRule, RecurrenceType, SeriesState, Task, TaskPriority, TaskStatus,
};

/// Builder for creating test Task entities
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new() -> Self {
        Self {
            task: Task {
                id: 1,
                name: "test_task".to_string(),
                description: None,
                project_id: None,
                tags: vec![],
                priority: TaskPriority::Medium,
                due_date: None,
                completed_at: None,
                status: TaskStatus::NotStarted,
                recurrence: None,
                recurring_parent_id: None,
                series_state: SeriesState::Active,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.task.id = id;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.task.name = name.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.task.description = Some(description.to_string());
        self
    }

    pub fn with_project_id(mut self, project_id: i64) -> Self {
        self.task.project_id = Some(project_id);
        self
    }

    pub fn with_tags(mut self, tags: Vec<&str>) -> Self {
        self.task.tags = tags.into_iter().map(String::from).collect();
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.task.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.task.due_date = Some(due_date);
        self
    }

    pub fn with_completed_at(mut self, completed_at: DateTime<Utc>) -> Self {
        self.task.completed_at = Some(completed_at);
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.task.status = status;
        self
    }

    pub fn with_recurrence(mut self, rule: RecurrenceRule) -> Self {
        self.task.recurrence = Some(rule);
        self
    }

    pub fn with_recurring_parent_id(mut self, parent_id: i64) -> Self {
        self.task.recurring_parent_id = Some(parent_id);
        self
    }

    pub fn with_series_state(mut self, state: SeriesState) -> Self {
        self.task.series_state = state;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test RecurrenceRule values
pub struct RecurrenceRuleBuilder {
    rule: RecurrenceRule,
}

impl RecurrenceRuleBuilder {
    pub fn new(rule_type: RecurrenceType) -> Self {
        Self {
            rule: RecurrenceRule {
                rule_type,
                ..RecurrenceRule::none()
            },
        }
    }

    pub fn daily() -> Self {
        Self::new(RecurrenceType::Daily)
    }

    pub fn weekly(weekdays: Vec<u8>) -> Self {
        let mut builder = Self::new(RecurrenceType::Weekly);
        builder.rule.weekdays = weekdays;
        builder
    }

    pub fn monthly() -> Self {
        Self::new(RecurrenceType::Monthly)
    }

    pub fn monthly_weekday(weekday: u8, week_of_month: u8) -> Self {
        let mut builder = Self::new(RecurrenceType::MonthlyWeekday);
        builder.rule.weekdays = vec![weekday];
        builder.rule.week_of_month = Some(week_of_month);
        builder
    }

    pub fn monthly_last_day() -> Self {
        Self::new(RecurrenceType::MonthlyLastDay)
    }

    pub fn with_interval(mut self, interval: u32) -> Self {
        self.rule.interval = interval;
        self
    }

    pub fn with_month_day(mut self, month_day: u8) -> Self {
        self.rule.month_day = Some(month_day);
        self
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.rule.end_date = Some(end_date);
        self
    }

    pub fn completion_based(mut self) -> Self {
        self.rule.completion_based = true;
        self
    }

    pub fn with_series_start(mut self, series_start: NaiveDate) -> Self {
        self.rule.series_start = Some(series_start);
        self
    }

    pub fn build(self) -> RecurrenceRule {
        self.rule
    }
}
