//! Data structures for catalog configuration.
//!
//! These are the serialized forms of chains and mission profiles, designed
//! to be deserialized from RON documents and converted into a [`Catalog`].
//!
//! **Note:** This module contains no IO. It parses text handed to it; file
//! loading is handled by `rfse_tools`.
//!
//! [`Catalog`]: crate::catalog::Catalog

mod catalog_data;
mod chain_data;
mod mission_data;

pub use catalog_data::CatalogData;
pub use chain_data::ChainData;
pub use mission_data::MissionData;
