// src/lib.rs

//! Sitewatch Change-Detection Library

pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
