// src/clients/mod.rs

pub mod compute;
pub mod email;
pub mod gateway;
