pub mod blog_store;
pub mod image;
pub mod mailer;
pub mod notification;
pub mod rand;
pub mod upload;
