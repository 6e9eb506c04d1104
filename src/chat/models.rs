//! Chat data models

use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug)]
pub struct ChatRequest {
    pub prompt: String,
}

#[derive(Serialize, Debug)]
pub struct ChatResponse {
    pub message: String,
}
