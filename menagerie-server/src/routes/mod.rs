//! HTTP route handlers

pub mod board;
pub mod relay;
pub mod rooms;
pub mod rulesets;
pub mod status;
