//! Moonglade - A self-hosted blogging platform
//!
//! This library provides the core functionality for the Moonglade blog:
//! posts, pages, comments, webmention/pingback and the admin API.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod utils;
