pub mod api;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod evals;
pub mod execution;
pub mod grammar;
pub mod intent;
pub mod llm;
pub mod server;
pub mod sql;
pub mod translator;
pub mod validator;

pub use error::{NlqError, Result};
