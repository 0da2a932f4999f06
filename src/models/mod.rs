pub mod status;
pub mod task;
pub mod agent_task;
pub mod analysis;
pub mod event;

pub use status::*;
pub use task::*;
pub use agent_task::*;
pub use analysis::*;
pub use event::*;
