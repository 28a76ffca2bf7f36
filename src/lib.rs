// src/lib.rs

pub mod accounts;
pub mod app;
pub mod broker;
pub mod catalog;
pub mod config;
pub mod desk;
pub mod dispatch;
pub mod forecast;
pub mod frontend;
pub mod logger;
pub mod models;
pub mod storage;
