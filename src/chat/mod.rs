// Chat module - authenticated proxy to the AI backend

pub mod handlers;
pub mod models;
pub mod routes;

pub use routes::chat_routes;
