//! Mercadito storefront library.
//!
//! This crate provides the storefront client core as a library,
//! allowing it to be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod broadcast;
pub mod cart;
pub mod config;
pub mod guard;
pub mod notify;
pub mod session;
pub mod state;
pub mod storage;
