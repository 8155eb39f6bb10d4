pub mod query_service;
pub mod subscription_service;
