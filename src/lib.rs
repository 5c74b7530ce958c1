pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod replay;
pub mod service;
pub mod session;
pub mod store;
