//! # markus-core
//!
//! Shared building blocks for the MarkUs certificate portal.
//!
//! - **Participants**: the participant/event record and its issuance state
//! - **Roll numbers**: normalization and cohort derivation rules
//! - **Store**: the SQLite-backed participant store, which is also the only
//!   cross-request coordination device
//! - **Upload**: the gateway that turns a rendered file into a permanent URL
//! - **Observability**: logging initialization and span helpers
//!
//! ## Example
//!
//! ```rust,no_run
//! use markus_core::prelude::*;
//!
//! # fn main() -> std::result::Result<(), StoreError> {
//! let store = ParticipantStore::open("participants.db")?;
//! for record in store.find_for_roll("23CS001")? {
//!     println!("{} -> {:?}", record.event, record.cert_url);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod observability;
pub mod participant;
pub mod roll;
pub mod store;
pub mod upload;

pub use error::{Error, Result};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::participant::{
        DepartmentStats, Entrant, EventStats, IssuanceState, MemberRole, ParticipantRecord, RecordFilter, TeamEntry,
    };
    pub use crate::store::{ParticipantStore, StoreError, TeamSyncOutcome};
    pub use crate::upload::{CloudinaryConfig, CloudinaryGateway, MemoryGateway, UploadError, UploadGateway};
}
