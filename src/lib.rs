//! Concurrent track downloader for the Yandex Music catalog.
//!
//! Tracks go through a fixed pipeline:
//!
//! 1. [`gateway::Gateway`] fetches their metadata from the catalog.
//! 2. [`downloads::Downloads`] takes them in, marks duplicates and orders
//!    them for display.
//! 3. A run downloads every eligible track, a few at a time, resolving a
//!    signed link per track with [`resolver`].
//! 4. The consumer pulls progress from a [`bridge::Bridge`] and applies it
//!    back to the session until the run completes.
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[macro_use]
extern crate log;

pub mod bridge;
pub mod config;
pub mod dedup;
pub mod downloads;
pub mod error;
pub mod events;
pub mod gateway;
pub mod http;
pub mod protocol;
pub mod resolver;
pub mod scheduler;
pub mod source;
pub mod token;
pub mod track;
pub mod util;
