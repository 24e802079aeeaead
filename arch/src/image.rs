use std::fmt::Write;

use tracing::debug;

use crate::error::Error;

/// Size of the main memory in bytes (the whole 17-bit `maddr` range).
pub const MEM_SIZE: usize = 0x20000;
pub const ADDR_MASK: u32 = 0x1ffff;

/// Layout of the sparse hex text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HexStyle {
    /// One line per defined word, as written by the assembler.
    Words,
    /// Defined bytes, 16 per line, as written by the simulator.
    Bytes,
}

/// Main memory contents plus a mask of the bytes that carry defined data.
/// Zero is valid data, so presence is never inferred from the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    bytes: Vec<u8>,
    defined: Vec<bool>,
}

impl Default for Image {
    fn default() -> Self {
        Self::new()
    }
}

impl Image {
    pub fn new() -> Self {
        Image {
            bytes: vec![0; MEM_SIZE],
            defined: vec![false; MEM_SIZE],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    // ------------------------------------------------------------------------
    // Wrapping access. Addresses are taken modulo the memory size.

    pub fn byte(&self, addr: u32) -> u8 {
        self.bytes[(addr & ADDR_MASK) as usize]
    }

    pub fn is_defined(&self, addr: u32) -> bool {
        self.defined[(addr & ADDR_MASK) as usize]
    }

    pub fn set_byte(&mut self, addr: u32, value: u8) {
        let addr = (addr & ADDR_MASK) as usize;
        self.bytes[addr] = value;
        self.defined[addr] = true;
    }

    pub fn word(&self, addr: u32) -> u32 {
        (0..4).fold(0, |w, i| w | (self.byte(addr.wrapping_add(i)) as u32) << (8 * i))
    }

    pub fn dword(&self, addr: u32) -> u64 {
        (0..8).fold(0, |w, i| w | (self.byte(addr.wrapping_add(i)) as u64) << (8 * i))
    }

    pub fn set_word(&mut self, addr: u32, value: u32) {
        for (i, b) in value.to_le_bytes().into_iter().enumerate() {
            self.set_byte(addr.wrapping_add(i as u32), b);
        }
    }

    // ------------------------------------------------------------------------
    // Checked access for building images

    /// Store a little-endian word and mark it defined. Fails instead of
    /// wrapping when the word does not fit.
    pub fn write_word(&mut self, addr: usize, value: u32) -> Result<(), Error> {
        if addr + 4 > MEM_SIZE {
            return Err(Error::OutOfRange(addr));
        }
        self.bytes[addr..addr + 4].copy_from_slice(&value.to_le_bytes());
        self.defined[addr..addr + 4].fill(true);
        Ok(())
    }

    /// Copy raw bytes to address 0 without marking them defined.
    pub fn load_bin(&mut self, data: &[u8]) -> Result<(), Error> {
        if data.len() > MEM_SIZE {
            return Err(Error::TooLarge(data.len()));
        }
        self.bytes[..data.len()].copy_from_slice(data);
        debug!("read {} bytes from bin file", data.len());
        Ok(())
    }

    pub fn clear_defined(&mut self) {
        self.defined.fill(false);
    }

    /// End of the defined data, rounded up to a word boundary.
    pub fn defined_end(&self) -> usize {
        match self.defined.iter().rposition(|&d| d) {
            Some(last) => (last + 4) & !3,
            None => 0,
        }
    }

    // ------------------------------------------------------------------------
    // Output

    /// Flat dump. With `trim`, everything after the last defined word is cut.
    pub fn to_bin(&self, trim: bool) -> Vec<u8> {
        let end = if trim { self.defined_end() } else { MEM_SIZE };
        self.bytes[..end].to_vec()
    }

    pub fn to_hex(&self, style: HexStyle) -> String {
        match style {
            HexStyle::Words => self.to_hex_words(),
            HexStyle::Bytes => self.to_hex_bytes(),
        }
    }

    fn to_hex_words(&self) -> String {
        let mut out = String::new();
        let mut print_addr = true;
        for addr in (0..MEM_SIZE).step_by(4) {
            if !self.defined[addr..addr + 4].iter().any(|&d| d) {
                print_addr = true;
                continue;
            }
            if print_addr {
                debug!("new hex file section at 0x{:05x}", addr);
                let _ = writeln!(out, "@{:05x}", addr);
                print_addr = false;
            }
            let b = &self.bytes[addr..addr + 4];
            let _ = writeln!(out, "{:02x} {:02x} {:02x} {:02x}", b[0], b[1], b[2], b[3]);
        }
        out
    }

    fn to_hex_bytes(&self) -> String {
        let mut out = String::new();
        let mut cnt = 0;
        for addr in 0..MEM_SIZE {
            if !self.defined[addr] {
                if cnt != 0 {
                    out.push('\n');
                    cnt = 0;
                }
                continue;
            }
            if cnt == 0 && (addr == 0 || !self.defined[addr - 1]) {
                debug!("new hex file section at 0x{:05x}", addr);
                let _ = writeln!(out, "@{:05x}", addr);
            }
            if cnt == 16 {
                out.push('\n');
                cnt = 0;
            } else if cnt != 0 {
                out.push(' ');
            }
            let _ = write!(out, "{:02x}", self.bytes[addr]);
            cnt += 1;
        }
        if cnt != 0 {
            out.push('\n');
        }
        out
    }

    // ------------------------------------------------------------------------
    // Input

    /// Parse either hex style. Every listed byte is marked defined.
    pub fn from_hex(text: &str) -> Result<Image, Error> {
        let mut image = Image::new();
        let mut addr = 0usize;
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(pos) = line.strip_prefix('@') {
                addr = usize::from_str_radix(pos, 16)
                    .map_err(|_| Error::HexSyntax(idx + 1, line.to_string()))?;
                continue;
            }
            for tok in line.split_whitespace() {
                let value = u8::from_str_radix(tok, 16)
                    .map_err(|_| Error::HexSyntax(idx + 1, line.to_string()))?;
                if addr >= MEM_SIZE {
                    return Err(Error::OutOfRange(addr));
                }
                image.set_byte(addr as u32, value);
                addr += 1;
            }
        }
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapping_access() {
        let mut image = Image::new();
        image.set_word(0x1fffe, 0x4433_2211);
        assert_eq!(image.byte(0x1fffe), 0x11);
        assert_eq!(image.byte(0x1ffff), 0x22);
        assert_eq!(image.byte(0), 0x33);
        assert_eq!(image.byte(1), 0x44);
        assert_eq!(image.word(0x1fffe), 0x4433_2211);
        assert!(image.is_defined(0));
        assert!(!image.is_defined(2));
    }

    #[test]
    fn checked_write() {
        let mut image = Image::new();
        assert!(image.write_word(MEM_SIZE - 4, 1).is_ok());
        assert!(matches!(
            image.write_word(MEM_SIZE - 2, 1),
            Err(Error::OutOfRange(_))
        ));
    }

    #[test]
    fn zero_is_data() {
        let mut image = Image::new();
        image.write_word(8, 0).unwrap();
        assert_eq!(image.to_hex(HexStyle::Words), "@00008\n00 00 00 00\n");
        assert_eq!(image.defined_end(), 12);
    }

    #[test]
    fn hex_words() {
        let mut image = Image::new();
        image.write_word(0, 0x0403_0201).unwrap();
        image.write_word(4, 0x0807_0605).unwrap();
        image.write_word(0x100, 0xdead_beef).unwrap();
        assert_eq!(
            image.to_hex(HexStyle::Words),
            "@00000\n01 02 03 04\n05 06 07 08\n@00100\nef be ad de\n"
        );
    }

    #[test]
    fn hex_bytes() {
        let mut image = Image::new();
        for i in 0..18 {
            image.set_byte(0x10 + i, i as u8);
        }
        image.set_byte(0x300, 0x7f);
        assert_eq!(
            image.to_hex(HexStyle::Bytes),
            "@00010\n\
             00 01 02 03 04 05 06 07 08 09 0a 0b 0c 0d 0e 0f\n\
             10 11\n\
             @00300\n\
             7f\n"
        );
    }

    #[test]
    fn hex_reads_back() {
        let mut image = Image::new();
        image.write_word(0x20, 0x1234_5678).unwrap();
        image.set_byte(0x41, 0xff);
        for style in [HexStyle::Words, HexStyle::Bytes] {
            let back = Image::from_hex(&image.to_hex(style)).unwrap();
            assert_eq!(back.word(0x20), 0x1234_5678);
            assert_eq!(back.byte(0x41), 0xff);
            assert!(back.is_defined(0x23));
        }
    }

    #[test]
    fn hex_syntax_error() {
        assert!(matches!(
            Image::from_hex("@00000\n01 zz\n"),
            Err(Error::HexSyntax(2, _))
        ));
    }

    #[test]
    fn bin_trim() {
        let mut image = Image::new();
        assert!(image.to_bin(true).is_empty());
        image.set_byte(5, 0xaa);
        assert_eq!(image.to_bin(true), vec![0, 0, 0, 0, 0, 0xaa, 0, 0]);
        assert_eq!(image.to_bin(false).len(), MEM_SIZE);
    }

    #[test]
    fn load_bin_leaves_mask_clear() {
        let mut image = Image::new();
        image.load_bin(&[1, 2, 3]).unwrap();
        assert_eq!(image.byte(2), 3);
        assert!(!image.is_defined(0));
        assert!(matches!(
            image.load_bin(&vec![0; MEM_SIZE + 1]),
            Err(Error::TooLarge(_))
        ));
    }
}
