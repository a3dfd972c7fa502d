//! Analytics: persistent event queue, batched flush and the intake service

pub mod flush;
pub mod queue;
pub mod tracker;

pub use flush::{FlushReport, FlushTask};
pub use queue::EventQueue;
pub use tracker::{Analytics, AnalyticsContext};
