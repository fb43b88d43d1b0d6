//! Instruction set: the catalog and the 32-bit encoding.
//!
//! 1. **Catalog** (`catalog`): opcode <-> mnemonic/category/encoding-type/latency.
//! 2. **Encoding** (`encoding`): the R/I/J bit layouts and decode/encode.

pub mod catalog;
pub mod encoding;

pub use catalog::{Category, EncodingType, InstructionInfo, CATALOG};
pub use encoding::{decode, encode, Instruction, OperandForm, REGISTER_COUNT};
