//! `salesdesk-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the sales form
//! engine and its adapters (no view or IO concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::RecordId;
pub use value_object::ValueObject;
