//! 循环任务调度引擎核心：
//! 发生日计算（calculator）、实例生成（generator）与扫描驱动（driver）

pub mod calculator;
pub mod driver;
pub mod generator;

pub use calculator::OccurrenceCalculator;
pub use driver::RecurrenceSweeper;
pub use generator::{Generation, InstanceGenerator};
