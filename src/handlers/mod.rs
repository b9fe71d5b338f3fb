pub mod auth;
pub mod dashboard;
pub mod pdf;
pub mod report;
pub mod session;
pub mod stripe;
pub mod subscription;
pub mod token_store;
