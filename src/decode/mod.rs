//! The three legacy decompressors. Each takes a freshly classified
//! `Content` (input positioned right after its magic number) and returns a
//! `DecodeStatus`; on `Good`/`BadCrc` the decoded bytes are left in
//! `content.output`.

pub mod crlzh;
pub mod crunch;
pub mod squeeze;

pub use crlzh::uncr_lzh;
pub use crunch::uncrunch;
pub use squeeze::unsqueeze;
