#![cfg(not(doctest))]

pub mod db;
pub mod email;
pub mod models;
pub mod otp;
pub mod request_io;
pub mod schema;
pub mod service;
pub mod store;
pub mod threadrand;
