pub mod config;
pub mod decimal;
pub mod domain;
pub mod error;
pub mod repository;
pub mod services;
