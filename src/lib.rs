// Library exports for Photoshare
// This allows integration tests and external code to use Photoshare modules

pub mod access;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod mentions;
pub mod routes;
pub mod state;
pub mod uploads;
