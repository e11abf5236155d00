//! Core value types shared by both ledgers

pub mod context;
pub mod ids;
pub mod principal;
pub mod text;
