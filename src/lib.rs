//! Newsroom - a role-gated news API
//!
//! Users publish news into categories and comment on it. Every operation is
//! checked by the permission engine against the caller's role flags.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod permissions;
pub mod services;
