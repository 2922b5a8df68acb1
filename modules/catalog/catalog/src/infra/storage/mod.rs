//! Storage infrastructure for the catalog.

pub mod entity;
pub mod mapper;
