//! DermAid: skincare and skin-condition recommendation agents.

pub mod agents;
pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod llm;
pub mod profile;
pub mod rules;
pub mod scan;
pub mod store;
pub mod weather;
