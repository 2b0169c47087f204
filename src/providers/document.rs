//! Parser for the provider's dynamic rate document.
//!
//! A successful response looks like
//!
//! ```xml
//! <ValCurs ID="R01235" DateRange1="15.01.2021" DateRange2="15.04.2021" name="Foreign Currency Market Dynamic">
//!   <Record Date="15.01.2021" Id="R01235"><Nominal>1</Nominal><Value>73,5453</Value></Record>
//!   ...
//! </ValCurs>
//! ```
//!
//! while a rejected request carries only text in the root element, e.g.
//! `<ValCurs>Error in parameters</ValCurs>`.

use crate::core::error::{RateError, Result};
use serde::Deserialize;
use tracing::{debug, error};

/// One dated data point, rate kept exactly as the provider formatted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateRecord {
    pub date: String,
    pub rate: String,
}

#[derive(Debug, Deserialize)]
struct ValCursMessage {
    #[serde(rename = "$value")]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ValCursRecords {
    #[serde(rename = "Record", default)]
    records: Vec<RawRecord>,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "Date", default)]
    date: Option<String>,
    #[serde(rename = "Value", default)]
    value: Option<String>,
}

/// Drops a leading BOM and `<?xml ...?>` prolog.
///
/// The text has already been decoded, so a declared legacy encoding would
/// only mislead the XML reader.
pub(crate) fn strip_xml_declaration(xml: &str) -> &str {
    let trimmed = xml.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with("<?xml")
        && let Some(end) = trimmed.find("?>")
    {
        return trimmed[end + 2..].trim_start();
    }
    trimmed
}

/// Returns the in-band error text if the root holds text instead of records.
fn in_band_error(xml: &str) -> Option<String> {
    serde_xml_rs::from_str::<ValCursMessage>(xml)
        .ok()
        .map(|m| m.text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Extracts the record sequence, or the provider's in-band error.
pub fn parse_records(document: &str) -> Result<Vec<RateRecord>> {
    let xml = strip_xml_declaration(document);

    if let Some(message) = in_band_error(xml) {
        debug!("Provider returned in-band error: {}", message);
        return Err(RateError::validation(message));
    }

    let parsed: ValCursRecords = serde_xml_rs::from_str(xml).map_err(|e| {
        error!(
            error = %e,
            response = %document,
            "Failed to parse provider document"
        );
        RateError::invalid_document()
    })?;

    parsed
        .records
        .into_iter()
        .map(|raw| -> Result<RateRecord> {
            let rate = raw
                .value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(RateError::invalid_document)?;
            Ok(RateRecord {
                date: raw.date.unwrap_or_default(),
                rate,
            })
        })
        .collect()
}

/// Rates of the first and last records.
///
/// The provider lists records chronologically, so these are the values
/// for the two ends of the requested range.
pub fn boundary_rates(records: &[RateRecord]) -> Result<(String, String)> {
    match (records.first(), records.last()) {
        (Some(first), Some(last)) => Ok((first.rate.clone(), last.rate.clone())),
        _ => Err(RateError::invalid_document()),
    }
}

pub fn parse_range(document: &str) -> Result<(String, String)> {
    let records = parse_records(document)?;
    debug!("Provider document carries {} records", records.len());
    boundary_rates(&records)
}
