pub mod store;
pub mod generator;

pub use store::TaskStore;
pub use generator::{load_analysis, plan_tasks, TaskGenerator};
