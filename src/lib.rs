// src/lib.rs

//! carwatch: polls a car classifieds listing page and reports unseen ads

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
