//! CRC64 checksum
//!
//! Running CRC64 with the ISO polynomial (reflected form `0xD800000000000000`),
//! initial value and final xor all ones. The check value for `"123456789"`
//! is `0xB90956C775A41001`.

/// ISO 3309 polynomial, bit-reflected
const ISO_POLY: u64 = 0xD800_0000_0000_0000;

/// Lookup table for byte-at-a-time computation
static CRC64_TABLE: [u64; 256] = build_table();

const fn build_table() -> [u64; 256] {
    let mut table = [0u64; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u64;
        let mut bit = 0;
        while bit < 8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ ISO_POLY;
            } else {
                crc >>= 1;
            }
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Running checksum over a byte stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Crc64 {
    value: u64,
}

impl Crc64 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `data` into the checksum
    pub fn update(&mut self, data: &[u8]) {
        let mut crc = !self.value;
        for &byte in data {
            crc = CRC64_TABLE[((crc as u8) ^ byte) as usize] ^ (crc >> 8);
        }
        self.value = !crc;
    }

    /// Checksum of everything folded in so far
    pub fn value(&self) -> u64 {
        self.value
    }
}

/// One-shot CRC64 of `data`
pub fn crc64(data: &[u8]) -> u64 {
    let mut crc = Crc64::new();
    crc.update(data);
    crc.value()
}
