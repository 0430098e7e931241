pub mod config;
pub mod control;
pub mod error;
pub mod fetch;
pub mod input;
pub mod logging;
pub mod orchestrator;
pub mod persist;
pub mod rate_limit;
pub mod retry;
pub mod sharder;
pub mod token_pool;
pub mod worker;
