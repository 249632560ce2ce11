//! Shared test utilities: in-memory repository mock and entity builders

pub mod builders;
pub mod mocks;

pub use builders::{RecurrenceRuleBuilder, TaskBuilder};
pub use mocks::MockTaskRepository;
