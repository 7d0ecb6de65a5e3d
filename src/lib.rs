// Library for the agent binary and integration tests

pub mod agent;
pub mod alerts;
pub mod config;
pub mod credentials;
pub mod docker_repo;
pub mod error;
pub mod models;
pub mod plugins;
pub mod routes;
pub mod sampler;
pub mod services;
pub mod stream;
pub mod tunnel;
pub mod version;
pub mod worker;
