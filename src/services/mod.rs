pub mod ai;
pub mod analytics;
pub mod auth;
pub mod catalog;
pub mod chat;
pub mod metadata;
pub mod profile;
pub mod recommendations;
