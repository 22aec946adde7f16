//! # arrdesk-starr
//!
//! Client for the *arr application APIs.
//!
//! This crate handles:
//! - Listing quality profiles, metadata profiles and download clients
//! - Deleting and creating them by id
//! - Exporting a selection to a JSON file and importing it elsewhere
//!
//! A [`StarrClient`] is built from a stored instance profile and talks to
//! `<url>/api/<version>/<resource>`, with the version picked per app.

pub mod client;
pub mod error;
#[cfg(test)]
mod proptests;
pub mod resource;
pub mod transfer;

pub use client::{error_message, StarrClient, StarrItem, API_KEY_HEADER};
pub use error::StarrError;
pub use resource::{api_version, Resource};
pub use transfer::{select_items, ExportFile, ImportFailure, ImportReport, EXPORT_VERSION};
