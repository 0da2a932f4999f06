pub mod types;
pub mod classification;

pub use types::TaskhubError;
pub use classification::ErrorClassification;
