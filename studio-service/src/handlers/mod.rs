pub mod auth;
pub mod clients;
pub mod pages;
pub mod relationships;
pub mod students;
