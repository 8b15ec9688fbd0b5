pub mod analytics;
pub mod daily_log;
pub mod milestone;
pub mod user;
