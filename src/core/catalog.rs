//! Currency reference list published by the central bank

use crate::core::error::RateError;
use crate::providers::document::strip_xml_declaration;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyEntry {
    pub symbol: String,
    pub display_name: String,
    pub provider_id: String,
}

#[derive(Debug, Deserialize)]
struct Valuta {
    #[serde(rename = "Item", default)]
    items: Vec<ValutaItem>,
}

#[derive(Debug, Deserialize)]
struct ValutaItem {
    #[serde(rename = "ID", default)]
    id: Option<String>,
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "ISO_Char_Code", default)]
    iso_char_code: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Immutable symbol -> (name, provider id) table, kept in load order.
#[derive(Debug, Default)]
pub struct CurrencyCatalog {
    entries: Vec<CurrencyEntry>,
    index: HashMap<String, usize>,
}

impl CurrencyCatalog {
    pub fn new(entries: impl IntoIterator<Item = CurrencyEntry>) -> Self {
        let mut catalog = Self::default();
        for entry in entries {
            catalog.insert(entry);
        }
        catalog
    }

    // A repeated symbol overwrites the value but keeps the first position.
    fn insert(&mut self, entry: CurrencyEntry) {
        match self.index.get(&entry.symbol) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.index.insert(entry.symbol.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let valuta: Valuta = serde_xml_rs::from_str(strip_xml_declaration(xml))
            .context("Failed to parse currency reference list")?;

        let total = valuta.items.len();
        let catalog = Self::new(valuta.items.into_iter().filter_map(|item| {
            let entry = CurrencyEntry {
                symbol: non_empty(item.iso_char_code)?,
                display_name: non_empty(item.name)?,
                provider_id: non_empty(item.id)?,
            };
            Some(entry)
        }));

        debug!(
            "Catalog kept {} of {} items from reference list",
            catalog.len(),
            total
        );
        Ok(catalog)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read currency catalog: {}", path.display()))?;
        let xml = String::from_utf8(bytes).with_context(|| {
            format!(
                "Currency catalog is not valid UTF-8: {}. Re-encode it first.",
                path.display()
            )
        })?;
        let catalog = Self::from_xml(&xml)
            .with_context(|| format!("Invalid currency catalog: {}", path.display()))?;
        info!(
            "Loaded {} currencies from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Case-sensitive exact match on the symbol.
    pub fn lookup(&self, symbol: &str) -> Result<&CurrencyEntry, RateError> {
        self.index
            .get(symbol)
            .map(|&pos| &self.entries[pos])
            .ok_or_else(|| RateError::NotFound(symbol.to_string()))
    }

    pub fn list_all(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|e| (e.symbol.clone(), e.display_name.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
