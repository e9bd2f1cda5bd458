//! Service layer between automation hosts and the Dashino client.
//!
//! - [`Dashino`] holds one entry's client and defaults and implements
//!   `forward`, `set_state`, `set_state_field` and `clear_state`.
//! - [`SessionRegistry`] maps entry ids to live sessions.
//! - [`verify_connection`] / [`setup_entry`] run the setup-time probe.

pub mod entity;
pub mod error;
pub mod registry;
pub mod services;
pub mod verify;

pub use entity::{EntitySnapshot, EntityState, EntityStates, is_valid_entity_id};
pub use error::CoreError;
pub use registry::SessionRegistry;
pub use services::{
    ClearStateRequest, Dashino, ForwardRequest, ServiceDefaults, SetStateFieldRequest,
    SetStateRequest,
};
pub use verify::{Probe, VerifyError, setup_entry, verify_connection};
