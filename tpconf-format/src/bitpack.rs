//! Control-bit windows for the compressed stream
//!
//! Literal/match decisions and dictionary codes travel as 16-bit control
//! words, most significant bit first, interleaved with payload bytes. A word
//! sits at the position the stream had reached when its window was opened:
//! the writer reserves two bytes, keeps emitting payload, and patches the word
//! in once sixteen bits have accumulated.

use bitvec::prelude::*;

use crate::constants::CONTROL_WINDOW_BITS;
use crate::dictcode::{decode_dict_code, encode_dict_code};
use crate::endian::Endianness;
use crate::error::{Result, TpconfError};

/// Writer interleaving control windows with payload bytes
#[derive(Debug, Clone)]
pub struct ControlWriter {
    out: Vec<u8>,
    endianness: Endianness,
    window: u16,
    filled: usize,
    slot: usize,
}

impl ControlWriter {
    /// Continue `prefix`, reserving the first control word at its end
    pub fn new(mut prefix: Vec<u8>, endianness: Endianness) -> Self {
        let slot = prefix.len();
        prefix.extend_from_slice(&[0, 0]);
        Self {
            out: prefix,
            endianness,
            window: 0,
            filled: 0,
            slot,
        }
    }

    /// Append a raw payload byte
    pub fn push_byte(&mut self, byte: u8) {
        self.out.push(byte);
    }

    /// Append a control bit, opening a new window when the current one is full
    pub fn push_bit(&mut self, bit: bool) {
        if self.filled == CONTROL_WINDOW_BITS {
            self.flush_window();
            self.slot = self.out.len();
            self.out.extend_from_slice(&[0, 0]);
            self.window = 0;
            self.filled = 0;
        }
        self.window.view_bits_mut::<Msb0>().set(self.filled, bit);
        self.filled += 1;
    }

    /// Append a dictionary code
    ///
    /// # Panics
    ///
    /// Panics if `value` is below [`MIN_DICT_CODE`](crate::dictcode::MIN_DICT_CODE).
    /// Match lengths and distance codes are offset by two before they get here.
    pub fn push_dict_code(&mut self, value: u32) {
        for bit in encode_dict_code(value) {
            self.push_bit(bit);
        }
    }

    /// Bytes written so far, including reserved control slots
    pub fn len(&self) -> usize {
        self.out.len()
    }

    /// Whether nothing has been written
    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    /// Flush the final partial window (unused bits stay zero) and return the stream
    pub fn finish(mut self) -> Vec<u8> {
        self.flush_window();
        self.out
    }

    fn flush_window(&mut self) {
        let word = self.endianness.u16_bytes(self.window);
        self.out[self.slot..self.slot + 2].copy_from_slice(&word);
    }
}

/// Reader pulling control bits and payload bytes from a compressed stream
#[derive(Debug, Clone)]
pub struct ControlReader<'a> {
    src: &'a [u8],
    pos: usize,
    endianness: Endianness,
    window: u16,
    remaining: usize,
}

impl<'a> ControlReader<'a> {
    /// Start reading `src` at `pos`
    pub fn new(src: &'a [u8], pos: usize, endianness: Endianness) -> Self {
        Self {
            src,
            pos,
            endianness,
            window: 0,
            remaining: 0,
        }
    }

    /// Read the next control bit, loading a new word when the window is spent
    pub fn read_bit(&mut self) -> Result<bool> {
        if self.remaining == 0 {
            self.window = self.endianness.read_u16_at(self.src, self.pos)?;
            self.pos += 2;
            self.remaining = CONTROL_WINDOW_BITS;
        }
        let index = CONTROL_WINDOW_BITS - self.remaining;
        self.remaining -= 1;
        Ok(self.window.view_bits::<Msb0>()[index])
    }

    /// Read the next raw payload byte
    pub fn read_byte(&mut self) -> Result<u8> {
        let byte = *self.src.get(self.pos).ok_or(TpconfError::UnexpectedEof {
            needed: self.pos + 1,
            available: self.src.len(),
        })?;
        self.pos += 1;
        Ok(byte)
    }

    /// Read a dictionary code
    pub fn read_dict_code(&mut self) -> Result<u32> {
        decode_dict_code(|| self.read_bit())
    }

    /// Current byte position in the source
    pub fn position(&self) -> usize {
        self.pos
    }
}
