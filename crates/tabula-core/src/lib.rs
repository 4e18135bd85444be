//! # tabula-core
//!
//! Foundation types for the Tabula tabletop bridge.
//!
//! This crate provides the shared vocabulary the other Tabula crates depend on:
//!
//! - **Branded IDs**: [`ids::EntityId`], [`ids::SceneId`] as newtypes
//! - **Errors**: [`errors::BridgeError`] hierarchy via `thiserror`
//! - **Taxonomy**: [`taxonomy::MarkerTaxonomy`] mapping marker IDs to
//!   categories and display names
//! - **Data model**: [`observation::MarkerObservation`] and
//!   [`observation::MarkerBinding`]
//! - **Clock**: [`time::now_ms`] epoch-millisecond helper
//! - **Logging**: [`logging::init_subscriber`] tracing bootstrap
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other tabula crates.

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod logging;
pub mod observation;
pub mod taxonomy;
pub mod time;
