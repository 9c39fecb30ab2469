//! Application layer: the executor port and the cached repository over it.

pub mod error;
pub mod executor;
pub mod pagination;
pub mod repository;
