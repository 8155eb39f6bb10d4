pub mod config;
pub mod db;
pub mod models;
pub mod money;
pub mod pricing;
pub mod providers;
pub mod repos;
pub mod routes;
pub mod services;
