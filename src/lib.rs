pub mod controllers;
pub mod infra;
pub mod modules;
pub mod schemas;
