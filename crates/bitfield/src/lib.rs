//! Building blocks shared by every wire-format crate in this workspace.
//!
//! - [`BitField`]: an N-bit big-endian field at a fixed bit position
//! - [`bcd`]: binary-coded decimal digits packed into a field
//! - [`layout!`]: declares a zero-copy view type from a field table
//! - [`RecordLayout`]: a record whose size is stored in its own header
//! - [`RecordSeq`]: records packed back-to-back inside a bounded range
//! - [`GatedLayout`]: optional fields whose presence hangs on earlier flags
//!
//! ## License
//!
//! This project is licensed under the MIT or Apache-2.0 license. You can
//! choose between one of them if you use this work.
//!
//! `SPDX-License-Identifier: MIT OR Apache-2.0`
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(unsafe_code)]

pub mod bcd;
pub mod error;
mod field;
mod gated;
mod layout;
mod record;
mod sequence;

pub use bcd::BcdField;
pub use error::{FieldError, Result};
pub use field::{BitField, FieldValue};
pub use gated::GatedLayout;
pub use record::{LengthField, RecordLayout, synchsafe_decode, synchsafe_encode};
pub use sequence::{RecordRanges, RecordSeq, Records};
