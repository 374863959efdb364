//! Tarpit — a conversational scam-baiting honeypot.
//!
//! Each inbound message is classified into a scam category, scored for
//! urgency, answered in the voice of a matching victim persona, and recorded
//! in an append-only transcript plus an evidence trail.
//!
//! See `DESIGN.md` for architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod logging;

pub mod triage;

pub mod evidence;
pub mod store;

pub mod providers;
pub mod responder;

pub mod pipeline;
pub mod report;

pub mod http;
