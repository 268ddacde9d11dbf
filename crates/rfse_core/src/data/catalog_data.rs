//! Whole-catalog data document.

use serde::{Deserialize, Serialize};

use super::{ChainData, MissionData};
use crate::catalog::Catalog;
use crate::error::{EngineError, Result};

/// A catalog document: every chain and mission profile.
///
/// # Example RON
///
/// ```ron
/// CatalogData(
///     chains: [
///         (id: "well", outputs: { "water": 4 }),
///     ],
///     missions: [
///         (id: "scout", duration_days: 2),
///     ],
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogData {
    /// Chain definitions.
    #[serde(default)]
    pub chains: Vec<ChainData>,

    /// Mission profile definitions.
    #[serde(default)]
    pub missions: Vec<MissionData>,
}

impl CatalogData {
    /// Parse a catalog document from RON text.
    ///
    /// `source_name` names the document in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DataParse`] if the text is not a valid document.
    pub fn from_ron_str(source_name: &str, text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| EngineError::DataParse {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })
    }

    /// Build the read-only catalog.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateDefinition`] if ids repeat.
    pub fn into_catalog(self) -> Result<Catalog> {
        Catalog::new(
            self.chains.iter().map(ChainData::to_chain),
            self.missions.iter().map(MissionData::to_profile),
        )
    }
}

impl Catalog {
    /// Parse and build a catalog from RON text.
    ///
    /// # Errors
    ///
    /// Returns a parse error or a duplicate-definition error.
    pub fn from_ron_str(source_name: &str, text: &str) -> Result<Self> {
        CatalogData::from_ron_str(source_name, text)?.into_catalog()
    }
}
