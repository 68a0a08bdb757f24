//! Translation of gateway voice notifications into store operations.

pub mod ingestor;
pub mod transition;

pub use ingestor::EventIngestor;
pub use transition::Transition;
