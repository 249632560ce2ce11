//! 循环任务引擎领域层：实体、事件、仓储与服务抽象

pub mod entities;
pub mod events;
pub mod repositories;
pub mod services;

pub use entities::{
    RecurrenceRule, RecurrenceType, SeriesState, Task, TaskPriority, TaskStatus,
};
pub use events::TaskCompleted;
pub use repositories::TaskRepository;
pub use services::{SweepOutcome, SweepService};
