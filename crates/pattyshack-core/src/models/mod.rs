//! Data models for Pattyshack Ops

mod message;
mod shift;
mod stats;
mod task;
mod temperature;
mod user;

pub use message::{Message, MessagePriority};
pub use shift::Shift;
pub use stats::DashboardStats;
pub use task::{Subtask, Task, TaskStatus, TaskType};
pub use temperature::{TemperatureLog, TemperatureUnit};
pub use user::{Location, User, UserRole};
