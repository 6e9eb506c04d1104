// Users module - OAuth identity synchronization endpoint

pub mod handlers;
pub mod models;
pub mod routes;

pub use routes::users_routes;
