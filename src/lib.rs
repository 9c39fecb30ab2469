//! Cached, integrity-checked read API over paged and distinct entity lists.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod integrity;
