//! # markus-issuance
//!
//! Turns a participant record into a downloadable certificate, at most once.
//!
//! - **Renderer**: draws the participant's details onto the certificate
//!   template and writes a PNG
//! - **Coordinator**: the claim/wait protocol. Exactly one caller renders
//!   and uploads; concurrent callers for the same roll and event wait for
//!   the winner's URL
//! - **Pre-generation**: bulk issuance of pending records through the same
//!   protocol
//!
//! The participant store is the only coordination device: a claim is a
//! guarded update on the record's `generating` flag, so any number of
//! processes sharing the database file observe the same claims.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod coordinator;
pub mod error;
pub mod pregen;
pub mod renderer;

pub use error::{IssueError, RenderError};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::coordinator::{IssuanceCoordinator, IssuancePolicy, Issued};
    pub use crate::error::{IssueError, RenderError};
    pub use crate::pregen::{PregenReport, pregenerate};
    pub use crate::renderer::{ArtifactRenderer, CertificateRequest, RenderLayout, TemplateRenderer};
}
