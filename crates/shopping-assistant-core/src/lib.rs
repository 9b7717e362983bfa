//! # Shopping Assistant Core
//!
//! Transport-free logic for the shopping assistant: query normalization,
//! intent classification, score reconciliation, product projection, search
//! orchestration, response contract enforcement, and the chat coordinator.
//!
//! This crate contains no tokio runtime, sqlx, HTTP client, or filesystem
//! I/O. Search backends, the chat model, and the stores are reached through
//! the traits in [`backend`] and [`store`]; the `shopping-assistant` crate
//! supplies the HTTP and SQLite implementations.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Shared data types |
//! | [`normalize`] | Case, diacritic, and shorthand normalization |
//! | [`intent`] | Intent classification and result-count extraction |
//! | [`score`] | Similarity/distance reconciliation |
//! | [`project`] | Raw product record → display item |
//! | [`backend`] | Search backend and chat model seams |
//! | [`orchestrator`] | Text and image search pipeline |
//! | [`contract`] | Product-list extraction from model output |
//! | [`store`] | Conversation memory and policy store traits |
//! | [`policy`] | Policy JSON shapes and prompt context |
//! | [`assistant`] | Message routing |

pub mod assistant;
pub mod backend;
pub mod contract;
pub mod intent;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod policy;
pub mod project;
pub mod score;
pub mod store;
