use chrono::{DateTime, NaiveDate, Utc, Weekday};
use recur_core::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// 任务实体。设置了循环规则且没有recurring_parent_id的任务是"父任务"（模板），
/// 由引擎生成的实例通过recurring_parent_id指回父任务。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub project_id: Option<i64>,
    pub tags: Vec<String>,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    /// 循环规则：只在父任务上有权威性，实例上仅作展示快照
    pub recurrence: Option<RecurrenceRule>,
    pub recurring_parent_id: Option<i64>,
    /// 循环序列状态，只对父任务有意义
    pub series_state: SeriesState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    #[serde(rename = "NOT_STARTED")]
    NotStarted,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "DONE")]
    Done,
    #[serde(rename = "ARCHIVED")]
    Archived,
}

impl TaskStatus {
    fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "NOT_STARTED",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
            TaskStatus::Archived => "ARCHIVED",
        }
    }

    fn parse(s: &str) -> Result<Self, String> {
        match s {
            "NOT_STARTED" => Ok(TaskStatus::NotStarted),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "DONE" => Ok(TaskStatus::Done),
            "ARCHIVED" => Ok(TaskStatus::Archived),
            _ => Err(format!("Invalid task status: {s}")),
        }
    }
}

impl sqlx::Type<sqlx::Postgres> for TaskStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("VARCHAR")
    }
}

impl sqlx::Type<sqlx::Sqlite> for TaskStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for TaskStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        TaskStatus::parse(s).map_err(Into::into)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for TaskStatus {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        TaskStatus::parse(s).map_err(Into::into)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for TaskStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for TaskStatus {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskPriority {
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "MEDIUM")]
    Medium,
    #[serde(rename = "HIGH")]
    High,
    #[serde(rename = "URGENT")]
    Urgent,
}

impl TaskPriority {
    fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
            TaskPriority::Urgent => "URGENT",
        }
    }

    fn parse(s: &str) -> Result<Self, String> {
        match s {
            "LOW" => Ok(TaskPriority::Low),
            "MEDIUM" => Ok(TaskPriority::Medium),
            "HIGH" => Ok(TaskPriority::High),
            "URGENT" => Ok(TaskPriority::Urgent),
            _ => Err(format!("Invalid task priority: {s}")),
        }
    }
}

impl sqlx::Type<sqlx::Postgres> for TaskPriority {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("VARCHAR")
    }
}

impl sqlx::Type<sqlx::Sqlite> for TaskPriority {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for TaskPriority {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        TaskPriority::parse(s).map_err(Into::into)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for TaskPriority {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        TaskPriority::parse(s).map_err(Into::into)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for TaskPriority {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for TaskPriority {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
    }
}

/// 循环序列的状态机：ACTIVE -> ENDED（end_date已过）或 INVALID（规则校验失败）。
/// 用户重新编辑规则时由存储层复位为ACTIVE。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SeriesState {
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "ENDED")]
    Ended,
    #[serde(rename = "INVALID")]
    Invalid,
}

impl SeriesState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesState::Active => "ACTIVE",
            SeriesState::Ended => "ENDED",
            SeriesState::Invalid => "INVALID",
        }
    }

    fn parse(s: &str) -> Result<Self, String> {
        match s {
            "ACTIVE" => Ok(SeriesState::Active),
            "ENDED" => Ok(SeriesState::Ended),
            "INVALID" => Ok(SeriesState::Invalid),
            _ => Err(format!("Invalid series state: {s}")),
        }
    }
}

impl sqlx::Type<sqlx::Postgres> for SeriesState {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("VARCHAR")
    }
}

impl sqlx::Type<sqlx::Sqlite> for SeriesState {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for SeriesState {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        SeriesState::parse(s).map_err(Into::into)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for SeriesState {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        SeriesState::parse(s).map_err(Into::into)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for SeriesState {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for SeriesState {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
    }
}

/// 循环类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceType {
    None,
    Daily,
    Weekly,
    Monthly,
    MonthlyWeekday,
    MonthlyLastDay,
}

impl std::fmt::Display for RecurrenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecurrenceType::None => "none",
            RecurrenceType::Daily => "daily",
            RecurrenceType::Weekly => "weekly",
            RecurrenceType::Monthly => "monthly",
            RecurrenceType::MonthlyWeekday => "monthly_weekday",
            RecurrenceType::MonthlyLastDay => "monthly_last_day",
        };
        write!(f, "{s}")
    }
}

fn default_interval() -> u32 {
    1
}

/// 循环规则。作为JSON列嵌入任务记录；type为none时其余字段全部被忽略。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurrenceRule {
    #[serde(rename = "type")]
    pub rule_type: RecurrenceType,
    /// 正整数间隔，单位随type变化（天/周/月）
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// 星期序数集合，0=周日..6=周六；weekly用多个，monthly_weekday只用一个
    #[serde(default)]
    pub weekdays: Vec<u8>,
    /// 1-5，5表示"最后一个"；仅monthly_weekday使用
    #[serde(default)]
    pub week_of_month: Option<u8>,
    /// 1-31；仅monthly使用，缺省时沿用锚点的日号
    #[serde(default)]
    pub month_day: Option<u8>,
    /// 不允许在该日期当天或之后生成任何实例
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// true: 下次发生从完成时刻推算；false: 从到期日推算
    #[serde(default)]
    pub completion_based: bool,
    /// weekly间隔语义的周纪元，规则创建时固定为序列的首个锚点
    #[serde(default)]
    pub series_start: Option<NaiveDate>,
}

impl RecurrenceRule {
    pub fn none() -> Self {
        Self {
            rule_type: RecurrenceType::None,
            interval: 1,
            weekdays: Vec::new(),
            week_of_month: None,
            month_day: None,
            end_date: None,
            completion_based: false,
            series_start: None,
        }
    }

    pub fn is_none(&self) -> bool {
        self.rule_type == RecurrenceType::None
    }

    pub fn contains_weekday(&self, weekday: Weekday) -> bool {
        self.weekdays
            .contains(&(weekday.num_days_from_sunday() as u8))
    }

    /// 结构不变量校验。规则写入时由外部校验，引擎在计算前再次确认，
    /// 不变量被破坏时报InvalidRule而不是猜测语义。
    pub fn validate(&self) -> EngineResult<()> {
        if self.interval < 1 {
            return Err(EngineError::InvalidRule {
                reason: format!("interval必须为正整数, 实际为 {}", self.interval),
            });
        }

        if let Some(day) = self.weekdays.iter().find(|d| **d > 6) {
            return Err(EngineError::InvalidRule {
                reason: format!("星期序数必须在0-6之间, 实际为 {day}"),
            });
        }

        match self.rule_type {
            RecurrenceType::None | RecurrenceType::Daily | RecurrenceType::MonthlyLastDay => {}
            RecurrenceType::Weekly => {
                if self.weekdays.is_empty() {
                    return Err(EngineError::InvalidRule {
                        reason: "weekly规则要求非空的星期集合".to_string(),
                    });
                }
            }
            RecurrenceType::Monthly => {
                if let Some(day) = self.month_day {
                    if !(1..=31).contains(&day) {
                        return Err(EngineError::InvalidRule {
                            reason: format!("month_day必须在1-31之间, 实际为 {day}"),
                        });
                    }
                }
            }
            RecurrenceType::MonthlyWeekday => {
                if self.weekdays.len() != 1 {
                    return Err(EngineError::InvalidRule {
                        reason: format!(
                            "monthly_weekday规则要求恰好一个星期序数, 实际为 {} 个",
                            self.weekdays.len()
                        ),
                    });
                }
                match self.week_of_month {
                    Some(week) if (1..=5).contains(&week) => {}
                    Some(week) => {
                        return Err(EngineError::InvalidRule {
                            reason: format!("week_of_month必须在1-5之间, 实际为 {week}"),
                        });
                    }
                    None => {
                        return Err(EngineError::InvalidRule {
                            reason: "monthly_weekday规则要求设置week_of_month".to_string(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

impl Task {
    pub fn new(name: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // 将由数据库生成
            name,
            description: None,
            project_id: None,
            tags: Vec::new(),
            priority: TaskPriority::Medium,
            due_date: None,
            completed_at: None,
            status: TaskStatus::NotStarted,
            recurrence: None,
            recurring_parent_id: None,
            series_state: SeriesState::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// 由父模板派生一个具体实例：拷贝静态属性，规则只作只读展示快照
    pub fn instance_of(parent: &Task, due_date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // 将由数据库生成
            name: parent.name.clone(),
            description: parent.description.clone(),
            project_id: parent.project_id,
            tags: parent.tags.clone(),
            priority: parent.priority,
            due_date: Some(due_date),
            completed_at: None,
            status: TaskStatus::NotStarted,
            recurrence: parent.recurrence.clone(),
            recurring_parent_id: Some(parent.id),
            series_state: SeriesState::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// 是否为循环序列的父任务（模板）
    pub fn is_recurring_parent(&self) -> bool {
        self.recurring_parent_id.is_none()
            && self.recurrence.as_ref().is_some_and(|r| !r.is_none())
    }

    /// 是否为引擎生成的实例
    pub fn is_instance(&self) -> bool {
        self.recurring_parent_id.is_some()
    }

    pub fn is_done(&self) -> bool {
        matches!(self.status, TaskStatus::Done)
    }

    /// 以用户时区计算创建时刻所在的日历日，作为序列缺省的首个锚点
    pub fn created_date(&self, offset: chrono::FixedOffset) -> NaiveDate {
        self.created_at.with_timezone(&offset).date_naive()
    }

    pub fn entity_description(&self) -> String {
        match self.recurring_parent_id {
            Some(parent_id) => format!(
                "任务实例 '{}' (ID: {}, 父任务: {})",
                self.name, self.id, parent_id
            ),
            None => format!("任务 '{}' (ID: {})", self.name, self.id),
        }
    }
}
