pub mod payment_repo;
pub mod plan_repo;
pub mod promo_repo;
pub mod subscription_repo;
pub mod user_repo;
