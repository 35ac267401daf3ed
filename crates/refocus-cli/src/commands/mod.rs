pub mod capture;
pub mod config;
pub mod contexts;
pub mod restore;
pub mod switch;
