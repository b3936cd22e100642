#![doc = "The `task_tracker` library crate."]
#![doc = ""]
#![doc = "Domain models, credential and token handling, owner-scoped task storage,"]
#![doc = "routing and error handling for the task and incident tracker API."]
#![doc = "The binary (`main.rs`) wires these into an actix-web server."]

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod state;

pub use crate::error::AppError;
pub use crate::state::AppState;
