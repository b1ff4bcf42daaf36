#![allow(dead_code)]

pub mod app;
pub mod socket_guard;
