// src/handlers/mod.rs

pub mod auth;
pub mod documents;
pub mod exam_sessions;
pub mod feedback;
pub mod internal;
pub mod payments;
pub mod profile;
pub mod question_papers;
pub mod webhooks;
