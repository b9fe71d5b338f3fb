//! MealTimes client: session handling, REST API access and the flows built on
//! top of them (plan subscription, order overview, sales report export).

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
