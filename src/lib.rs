//! daebak - Korean reading practice
//!
//! This library provides the core functionality of the daebak site: articles
//! annotated with vocabulary and grammar, member accounts with sessions and
//! API tokens, and the JSON and HTML surfaces over them.

pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod services;
pub mod views;
pub mod web;
