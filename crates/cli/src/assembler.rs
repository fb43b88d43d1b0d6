//! Two-pass assembler: text assembly source to a 32-bit hex image.
//!
//! Pass one walks the source collecting label -> byte-address bindings and
//! `@0x<hex>:` data-preload blocks. Pass two re-walks, resolving each
//! instruction's operands against the instruction-set catalog
//! (`procsim_core::isa::catalog`) and the label table, and encodes one word
//! per instruction. The catalog's `EncodingType` is the single source of
//! truth for how many operands a mnemonic takes and what they mean; this
//! module never hard-codes a second opinion about instruction shape.

use procsim_core::common::{SimError, SimResult};
use procsim_core::isa::catalog::{self, Category, EncodingType, InstructionInfo};
use procsim_core::isa::encoding::{self, Instruction, OperandForm};
use std::collections::HashMap;

/// One assembled instruction: its byte address, encoded word, and the
/// original (comment-stripped) source line it came from.
#[derive(Debug, Clone)]
pub struct AssembledWord {
    /// Byte address in instruction memory.
    pub address: u32,
    /// The encoded 32-bit instruction word.
    pub word: u32,
    /// The source line this word was assembled from, for trace annotation.
    pub source: String,
}

/// A big-endian word to preload into data memory before the first cycle,
/// from an `@0x<hex>:` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPreload {
    /// Byte address in data memory.
    pub address: u32,
    /// The 32-bit value to store, big-endian.
    pub value: u32,
}

/// The output of assembling one source file.
#[derive(Debug, Clone, Default)]
pub struct Assembled {
    /// Instruction words, in program order.
    pub words: Vec<AssembledWord>,
    /// Data-memory preloads, in source order.
    pub preloads: Vec<DataPreload>,
}

impl Assembled {
    /// The little-endian byte image `Processor::new` expects for instruction
    /// memory.
    #[must_use]
    pub fn image_bytes(&self) -> Vec<u8> {
        self.words.iter().flat_map(|w| w.word.to_le_bytes()).collect()
    }

    /// Renders the `assembly.hex` artifact: one line per word, `AABBCCDD //
    /// 0x<addr> => <source text>`.
    #[must_use]
    pub fn hex_image(&self) -> String {
        let mut out = String::new();
        for w in &self.words {
            out.push_str(&format!("{:08X} // 0x{:04X} => {}\n", w.word, w.address, w.source));
        }
        out
    }

    /// Looks up the source text annotated at `address`, for trace output.
    #[must_use]
    pub fn source_at(&self, address: u32) -> Option<&str> {
        self.words.iter().find(|w| w.address == address).map(|w| w.source.as_str())
    }
}

const BYTES_PER_WORD: u32 = 4;

/// Assembles `source` into a hex image plus any data preloads.
///
/// # Errors
///
/// Returns [`SimError::Input`] on an unknown mnemonic, a malformed operand
/// count, an undefined label, or a malformed `@0x<hex>:` preload block, with
/// the offending line number in the message.
pub fn assemble(source: &str) -> SimResult<Assembled> {
    let mut labels = HashMap::new();
    let mut instruction_lines = Vec::new();
    let mut preload_blocks = Vec::new();
    let mut address = 0u32;

    for (raw_line_no, raw) in source.lines().enumerate() {
        let line_no = raw_line_no + 1;
        let line = strip_comment(raw);
        if line.is_empty() {
            continue;
        }
        if let Some(body) = line.strip_prefix('@') {
            preload_blocks.push((line_no, body.to_string()));
            continue;
        }
        if let Some(label) = line.strip_suffix(':') {
            let label = label.trim().to_string();
            if labels.insert(label.clone(), address).is_some() {
                return Err(SimError::Input(format!("line {line_no}: duplicate label `{label}`")));
            }
            continue;
        }
        instruction_lines.push((line_no, address, line));
        address = address.wrapping_add(BYTES_PER_WORD);
    }

    let mut words = Vec::with_capacity(instruction_lines.len());
    for (line_no, instr_address, text) in instruction_lines {
        let word = assemble_instruction(line_no, instr_address, &text, &labels)?;
        words.push(AssembledWord { address: instr_address, word, source: text });
    }

    let mut preloads = Vec::new();
    for (line_no, body) in preload_blocks {
        preloads.extend(parse_preload_block(line_no, &body)?);
    }

    Ok(Assembled { words, preloads })
}

/// Strips a `;`-to-end-of-line comment and surrounding whitespace.
fn strip_comment(line: &str) -> String {
    line.split(';').next().unwrap_or("").trim().to_string()
}

/// Parses an `@0x<hex>: w0 w1 w2 ...` preload block into individual
/// big-endian word preloads, one every four bytes starting at the block's
/// address.
fn parse_preload_block(line_no: usize, body: &str) -> SimResult<Vec<DataPreload>> {
    let (addr_text, words_text) = body
        .split_once(':')
        .ok_or_else(|| SimError::Input(format!("line {line_no}: malformed preload directive, expected `@0x<hex>: ...`")))?;
    let addr_text = addr_text.trim().trim_start_matches("0x").trim_start_matches("0X");
    let base = u32::from_str_radix(addr_text, 16)
        .map_err(|e| SimError::Input(format!("line {line_no}: bad preload address: {e}")))?;

    let mut preloads = Vec::new();
    for (i, token) in words_text.split_whitespace().enumerate() {
        let token = token.trim_start_matches("0x").trim_start_matches("0X");
        let value = u32::from_str_radix(token, 16)
            .map_err(|e| SimError::Input(format!("line {line_no}: bad preload word `{token}`: {e}")))?;
        preloads.push(DataPreload { address: base.wrapping_add(i as u32 * BYTES_PER_WORD), value });
    }
    Ok(preloads)
}

/// Operand layout for an instruction, independent of category: how many
/// tokens follow the mnemonic and what each one means. Mirrors the
/// catalog's `EncodingType` plus the handful of load/store mnemonics that
/// take fewer operands than their encoding type would otherwise suggest.
enum Layout {
    /// Three register operands: rd, rs, rt.
    TripleRegister,
    /// Two tokens: rd (also the sole source), immediate. `lli`/`lui`/`sli`/`sui`.
    RegisterImmediate,
    /// Three tokens: rd, rs, immediate. Arithmetic-immediate, load/store, branch.
    RegisterRegisterImmediate,
    /// One token: an address (resolved from a label, for `j`).
    Address,
}

fn layout_for(info: &InstructionInfo) -> Layout {
    match info.encoding {
        EncodingType::R => Layout::TripleRegister,
        EncodingType::J => Layout::Address,
        EncodingType::I => match info.mnemonic {
            "lli" | "lui" | "sli" | "sui" => Layout::RegisterImmediate,
            _ => Layout::RegisterRegisterImmediate,
        },
    }
}

fn assemble_instruction(
    line_no: usize,
    instr_address: u32,
    text: &str,
    labels: &HashMap<String, u32>,
) -> SimResult<u32> {
    let mut tokens = text.split(|c: char| c == ',' || c.is_whitespace()).filter(|t| !t.is_empty());
    let mnemonic = tokens
        .next()
        .ok_or_else(|| SimError::Input(format!("line {line_no}: empty instruction line")))?
        .to_lowercase();
    let info = catalog::lookup_by_mnemonic(&mnemonic)
        .ok_or_else(|| SimError::Input(format!("line {line_no}: unknown mnemonic `{mnemonic}`")))?;
    let operand_tokens: Vec<&str> = tokens.collect();

    let operands = match layout_for(info) {
        Layout::TripleRegister => {
            let [a, b, c] = require_n(line_no, &operand_tokens, "rd, rs, rt")?;
            OperandForm::R {
                rd: resolve_register(line_no, a)?,
                rs: resolve_register(line_no, b)?,
                rt: resolve_register(line_no, c)?,
                shamt: 0,
                funct: 0,
            }
        }
        Layout::RegisterImmediate => {
            let [a, b] = require_n(line_no, &operand_tokens, "rd, immediate")?;
            let rd = resolve_register(line_no, a)?;
            let immediate = resolve_immediate(line_no, b, instr_address, info.category, labels)? as u16;
            OperandForm::I { rd, rs: 0, immediate }
        }
        Layout::RegisterRegisterImmediate => {
            let [a, b, c] = require_n(line_no, &operand_tokens, "rd, rs, immediate")?;
            let rd = resolve_register(line_no, a)?;
            let rs = resolve_register(line_no, b)?;
            let immediate = resolve_immediate(line_no, c, instr_address, info.category, labels)? as u16;
            OperandForm::I { rd, rs, immediate }
        }
        Layout::Address => {
            let [a] = require_n(line_no, &operand_tokens, "address")?;
            let address = resolve_address(line_no, a, labels)?;
            OperandForm::J { address }
        }
    };

    Ok(encoding::encode(&Instruction { info, operands }))
}

fn require_n<'a, const N: usize>(line_no: usize, tokens: &[&'a str], expected: &str) -> SimResult<[&'a str; N]> {
    tokens
        .try_into()
        .map_err(|_| SimError::Input(format!("line {line_no}: expected {N} operands ({expected}), found {}", tokens.len())))
}

/// Resolves a register operand token (`Rn`).
fn resolve_register(line_no: usize, token: &str) -> SimResult<u32> {
    let digits: String = token.chars().filter(|c| !matches!(c, 'R' | 'r')).collect();
    digits
        .parse::<u32>()
        .map_err(|_| SimError::Input(format!("line {line_no}: expected a register operand, found `{token}`")))
}

/// Resolves an immediate-field operand: a label (resolved to a PC-relative
/// word offset), a decimal float packed to its IEEE-754 bit pattern for FPU
/// instructions, or a plain (possibly negative) decimal integer.
fn resolve_immediate(
    line_no: usize,
    token: &str,
    instr_address: u32,
    category: Category,
    labels: &HashMap<String, u32>,
) -> SimResult<u32> {
    if let Some(&label_address) = labels.get(token) {
        let diff = i64::from(label_address) - i64::from(instr_address) - i64::from(BYTES_PER_WORD);
        let offset = i32::try_from(diff)
            .map_err(|_| SimError::Input(format!("line {line_no}: branch offset to `{token}` out of range")))?;
        return Ok((offset >> 2) as u32);
    }
    if category == Category::FloatingPoint && !token.contains('R') && !token.contains('r') {
        let value: f32 = token
            .parse()
            .map_err(|_| SimError::Input(format!("line {line_no}: expected a float literal, found `{token}`")))?;
        return Ok(value.to_bits());
    }
    let value: i64 = token
        .parse()
        .map_err(|_| SimError::Input(format!("line {line_no}: expected a decimal immediate, found `{token}`")))?;
    Ok(value as u32)
}

/// Resolves a J-type address operand: a label, to an absolute word address
/// (`byte_address >> 2`); falls back to a literal decimal word address if
/// the token is not a known label.
fn resolve_address(line_no: usize, token: &str, labels: &HashMap<String, u32>) -> SimResult<u32> {
    match labels.get(token) {
        Some(&byte_address) => Ok(byte_address >> 2),
        None => token
            .parse::<u32>()
            .map_err(|_| SimError::Input(format!("line {line_no}: undefined label `{token}`"))),
    }
}
