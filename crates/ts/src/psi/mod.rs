//! Program Specific Information: sections, their reassembly from TS
//! payloads, and the MPEG-defined tables.

pub mod assembler;
pub mod cat;
pub mod pat;
pub mod pmt;
pub mod section;
pub mod table;

pub use assembler::SectionAssembler;
pub use cat::{CAT_TABLE_ID, Cat, CatTable};
pub use pat::{PAT_TABLE_ID, Pat, PatProgram, PatTable};
pub use pmt::{PMT_TABLE_ID, Pmt, PmtEs, PmtHeader, PmtTable, stream_type_name};
pub use section::{Section, TableSection, build_section};
pub use table::{PsiTable, SectionTable, TableSyntax, validate_section};
