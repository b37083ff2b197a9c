//! HTTP access to the MemoryHub backend collaborator.

pub mod client;

pub use client::{BackendClient, ImagePart};
