//! Compressed-case bytecode stream (compression code 1).
//!
//! Cells are encoded as one opcode byte each, packed into 8-byte command
//! groups. Each group is followed by the 8-byte payloads of its literal
//! (253) entries, in opcode order.

use crate::sav::error::Result;
use std::io::Write;

const SAV_CMD_GROUP_LEN: usize = 8;

const SAV_CMD_PADDING: u8 = 0;
const SAV_CMD_LITERAL: u8 = 253;
const SAV_CMD_SPACES: u8 = 254;
const SAV_CMD_SYSMIS: u8 = 255;

/// Opcodes 1..=251 encode the integer `opcode - bias` inline.
const SAV_CMD_COMPACT_MAX: u8 = 251;

const SPACE_ELEMENT: [u8; 8] = *b"        ";

/// Holds the in-flight command group; the output sink is passed into
/// each call so the caller keeps exclusive ownership of it.
pub(crate) struct BytecodeWriter {
    bias: f64,
    command: [u8; SAV_CMD_GROUP_LEN],
    cursor: usize,
    data: Vec<u8>,
}

impl BytecodeWriter {
    pub fn new(bias: f64) -> Self {
        Self {
            bias,
            command: [0u8; SAV_CMD_GROUP_LEN],
            cursor: 0,
            data: Vec::new(),
        }
    }

    pub fn write_missing<W: Write>(&mut self, sink: &mut W) -> Result<()> {
        self.push(sink, SAV_CMD_SYSMIS)
    }

    pub fn write_number<W: Write>(&mut self, sink: &mut W, value: f64) -> Result<()> {
        let biased = value + self.bias;
        // Compact only when the value is exactly representable as
        // opcode - bias; the round-trip check rejects values that merely
        // round to an integer once the bias is added. NaN fails every
        // comparison and always takes the literal path.
        if (1.0..=f64::from(SAV_CMD_COMPACT_MAX)).contains(&biased)
            && biased.fract() == 0.0
            && biased - self.bias == value
        {
            return self.push(sink, biased as u8);
        }
        self.data.extend_from_slice(&value.to_le_bytes());
        self.push(sink, SAV_CMD_LITERAL)
    }

    /// Writes `elements` 8-byte chunks of a left-justified, space-padded
    /// string cell.
    pub fn write_string_segment<W: Write>(
        &mut self,
        sink: &mut W,
        text: &[u8],
        elements: usize,
    ) -> Result<()> {
        let mut rest = text;
        for _ in 0..elements {
            let take = rest.len().min(SAV_CMD_GROUP_LEN);
            let (head, tail) = rest.split_at(take);
            rest = tail;
            let mut element = SPACE_ELEMENT;
            element[..head.len()].copy_from_slice(head);
            if element == SPACE_ELEMENT {
                self.push(sink, SAV_CMD_SPACES)?;
            } else {
                self.data.extend_from_slice(&element);
                self.push(sink, SAV_CMD_LITERAL)?;
            }
        }
        Ok(())
    }

    /// Zero-pads and emits the final command group. Always emits one, so
    /// a file with no cases still carries a terminating group.
    pub fn flush<W: Write>(&mut self, sink: &mut W) -> Result<()> {
        while self.cursor < SAV_CMD_GROUP_LEN {
            self.command[self.cursor] = SAV_CMD_PADDING;
            self.cursor += 1;
        }
        self.emit_group(sink)
    }

    fn push<W: Write>(&mut self, sink: &mut W, opcode: u8) -> Result<()> {
        self.command[self.cursor] = opcode;
        self.cursor += 1;
        if self.cursor == SAV_CMD_GROUP_LEN {
            self.emit_group(sink)?;
        }
        Ok(())
    }

    fn emit_group<W: Write>(&mut self, sink: &mut W) -> Result<()> {
        sink.write_all(&self.command)?;
        sink.write_all(&self.data)?;
        self.cursor = 0;
        self.data.clear();
        Ok(())
    }
}
