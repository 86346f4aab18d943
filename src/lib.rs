//! Tailor marketplace backend
//!
//! Customer-facing API for booking tailors: role-gated sessions, booking
//! drafts that survive reloads, order submission and AI virtual try-on
//! backed by an image generation service and S3-compatible storage.

pub mod app_state;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
