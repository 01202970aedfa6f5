//! Library half of the `blokgen` binary: config file discovery and CLI/config merging.

pub mod config;
