//! Directory record parsing and the bounded extent-size walk

pub mod record;
pub mod walk;

pub use walk::extent_size;
