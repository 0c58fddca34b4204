//! Catalog, view and playback state for the musicui player.
//!
//! Nothing in this crate touches the terminal or the audio player directly:
//! the catalog client speaks HTTP, and the playback controller describes what
//! the native player should do as a list of [`playback::AudioCommand`]s.

pub mod catalog;
pub mod config;
pub mod error;
pub mod platform;
pub mod playback;
pub mod track;
pub mod view;
