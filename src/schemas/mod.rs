pub mod blog;
pub mod booking;
