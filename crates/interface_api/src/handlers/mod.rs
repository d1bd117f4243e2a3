//! Request handlers

pub mod health;
pub mod auth;
pub mod claims;
pub mod agent;
pub mod blockchain;
