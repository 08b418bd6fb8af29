//! Compliance checks against the external compliance API.
//!
//! [`CheckKind`] is the closed set of audits (MFA, RLS, PITR) with per-variant metadata,
//! [`ComplianceApi`] issues the authenticated calls, [`CompliancePoller`] owns the per-check
//! state machine, and [`render`] turns snapshots into terminal text.

pub mod check;
pub mod client;
pub mod poller;
pub mod render;
pub mod report;

pub use check::*;
pub use client::*;
pub use poller::*;
pub use report::*;
