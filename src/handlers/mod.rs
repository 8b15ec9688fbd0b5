pub mod ai;
pub mod daily;
pub mod gamification;
pub mod health;
pub mod users;
