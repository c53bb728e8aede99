pub mod config;
pub mod cors;
pub mod db;
pub mod logging;
pub mod routes;
