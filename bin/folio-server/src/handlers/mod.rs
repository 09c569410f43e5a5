//! Request-independent logic shared by several route modules.

pub mod assistant;
pub mod credentials;
pub mod notify;
pub mod uploads;
