//! Zero-copy accessors for MPEG-2 transport streams and the tables they
//! carry.
//!
//! Every structure is a view over caller-owned bytes: packets, adaptation
//! fields, PES headers, PSI and DVB SI sections, descriptor loops and the
//! individual descriptors, and SCTE-35 splice info sections. Views read and
//! write fields in place; the `validate` methods report whether a buffer is
//! safe to walk. [`reader`] adds the stateful parts: packet framing, section
//! reassembly and table collection.

pub mod adaptation_field;
pub mod crc32;
pub mod descriptor;
pub mod descriptors;
pub mod dvb;
pub mod error;
pub mod packet;
pub mod pes;
pub mod psi;
pub mod reader;
pub mod scte35;

pub use adaptation_field::{AdaptationField, Pcr};
pub use crc32::{mpeg2_crc32, validate_section_crc32};
pub use descriptor::{Descriptor, DescriptorList, Descriptors, descriptor_list, descriptors};
pub use descriptors::{DescriptorKind, Registry};
pub use error::TsError;
pub use packet::{
    ContinuityMode, ContinuityStatus, PID_CAT, PID_NULL, PID_PAT, TS_PACKET_SIZE, TsPacket,
};
pub use pes::PesHeader;
pub use psi::{PsiTable, Section, SectionAssembler, SectionTable, TableSection, TableSyntax};
pub use reader::{DemuxEvent, PacketFormat, PacketReader, PsiDemux};
pub use scte35::{
    BreakDuration, SpliceCommand, SpliceCommandType, SpliceInfoSection, SpliceInsert, TimeSignal,
};

/// Result type for TS parsing operations
pub type Result<T> = std::result::Result<T, TsError>;
