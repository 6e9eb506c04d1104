// Insights module - document analysis pipeline and stored results

pub mod handlers;
pub mod models;
pub mod routes;


pub use routes::insights_routes;
