//! CRC32 (IEEE) for blob log records.

const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xEDB8_8320
            } else {
                crc >> 1
            };
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// Incremental CRC32 so a record can be checksummed piecewise without
/// first copying header and payload into one buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Crc32(u32);

impl Crc32 {
    pub(crate) const fn new() -> Self {
        Self(0xFFFF_FFFF)
    }

    pub(crate) fn update(mut self, data: &[u8]) -> Self {
        for &byte in data {
            let index = ((self.0 ^ u32::from(byte)) & 0xFF) as usize;
            self.0 = (self.0 >> 8) ^ CRC32_TABLE[index];
        }
        self
    }

    pub(crate) const fn finish(self) -> u32 {
        !self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_check_value() {
        // Standard check value for "123456789"
        assert_eq!(Crc32::new().update(b"123456789").finish(), 0xCBF4_3926);
    }

    #[test]
    fn crc32_incremental_matches_one_shot() {
        let whole = Crc32::new().update(b"header+payload").finish();
        let pieces = Crc32::new().update(b"header").update(b"+payload").finish();
        assert_eq!(whole, pieces);
    }

    #[test]
    fn crc32_empty() {
        assert_eq!(Crc32::new().finish(), 0);
    }
}
