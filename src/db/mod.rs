pub mod codec;
pub mod connection;
pub mod schema;
pub mod tasks;
pub mod agent_tasks;
pub mod reports;
pub mod requests;
pub mod events;

pub use connection::Database;
