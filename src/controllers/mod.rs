pub mod blog;
pub mod booking;
pub mod form;
pub mod health;
