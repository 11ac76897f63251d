//! Wire types for the catalog service.
//!
//! # Submodules
//!
//! * [`gateway`] - JSON and XML payloads of the catalog API
//!
//! # Shared Functionality
//!
//! Parsing helpers that log every payload at TRACE level, so that protocol
//! changes on the service side can be diagnosed from a verbose log:
//!
//! ```
//! use yadl::protocol;
//!
//! let envelope: Response<Track> = protocol::json(&body, "tracks")?;
//! let location: Location = protocol::xml(&body, "download-info")?;
//! ```

pub mod gateway;

use std::fmt::Debug;

use serde::Deserialize;

use crate::error::Result;

/// Parses and logs JSON responses from the catalog API.
///
/// # Arguments
///
/// * `body` - Response body text to parse
/// * `origin` - Description of API endpoint for logging
///
/// # Logging
///
/// * Success: Logs parsed structure at TRACE level
/// * Parse Error: Logs raw JSON at TRACE level if valid JSON
/// * Invalid JSON: Logs error and raw text at ERROR level
pub fn json<T>(body: &str, origin: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Debug,
{
    match serde_json::from_str(body) {
        Ok(result) => {
            trace!("{origin}: {result:#?}");
            Ok(result)
        }
        Err(e) => {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
                trace!("{origin}: {json:#?}");
            } else {
                error!("{origin}: failed parsing response ({e:?})");
                trace!("{body}");
            }
            Err(e.into())
        }
    }
}

/// Parses and logs XML responses from the catalog's download hosts.
///
/// Logs the parsed structure at TRACE level, or the raw body at ERROR level
/// when it cannot be parsed.
pub fn xml<T>(body: &str, origin: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Debug,
{
    match quick_xml::de::from_str(body) {
        Ok(result) => {
            trace!("{origin}: {result:#?}");
            Ok(result)
        }
        Err(e) => {
            error!("{origin}: failed parsing response ({e})");
            trace!("{body}");
            Err(e.into())
        }
    }
}
