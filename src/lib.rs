//! ccexport
//!
//! Reads Claude Code JSONL session logs and turns them into a typed session
//! model and portable Markdown/JSON documents.
//!
//! Data flows one way: raw lines → [`parser`] → [`aggregate`] (with
//! [`classify`] for tool results) → [`render`] → [`export`]. The remaining
//! modules are the collaborators around that pipeline: project discovery
//! ([`source`]), [`search`], text [`report`]s, [`config`] and [`logging`].

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod export;
pub mod logging;
pub mod model;
pub mod parser;
pub mod render;
pub mod report;
pub mod search;
pub mod source;

#[cfg(test)]
mod tests;
