//! Row models and their serialization projections.

pub mod announcement;
pub mod course;
pub mod entry;
pub mod message;
pub mod queue;
