// src/models/mod.rs

pub mod document;
pub mod exam_session;
pub mod plan;
pub mod question_paper;
pub mod transaction;
pub mod user;
