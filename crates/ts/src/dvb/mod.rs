//! DVB service information tables (EN 300 468).

pub mod bat;
pub mod eit;
pub mod nit;
pub mod sdt;
pub mod tdt;
pub mod text;
pub mod time;

pub use bat::{BAT_TABLE_ID, Bat, BatTable};
pub use eit::{Eit, EitEvent, EitHeader, EitTable};
pub use nit::{NIT_TABLE_ID_ACTUAL, NIT_TABLE_ID_OTHER, Nit, NitTable, NitTs};
pub use sdt::{SDT_TABLE_ID_ACTUAL, SDT_TABLE_ID_OTHER, Sdt, SdtService, SdtTable, running_status_name};
pub use tdt::{TDT_TABLE_ID, TOT_TABLE_ID, Tdt, Tot};
pub use text::dvb_text;
