//! From-scratch SHA-1 implementation.
//!
//! The authorization protocol is order- and endianness-sensitive and must
//! match the externally fixed digest bit-exactly; a wrong digest is silently
//! rejected by the service as unauthenticated rather than as a parse error.
//! The digest is therefore implemented here rather than taken from a
//! platform primitive, so the exact byte treatment stays under test.

/// Incremental SHA-1 digest state.
///
/// `update` may be called any number of times before `finalize`. After
/// `finalize` the instance must be [`reset`](Sha1::reset) before further use.
#[derive(Debug, Clone)]
pub struct Sha1 {
    state: [u32; 5],
    buffer: [u8; 64],
    buffer_len: usize,
    length_bytes: u64,
    finalized: bool,
}

const INITIAL_STATE: [u32; 5] = [0x6745_2301, 0xEFCD_AB89, 0x98BA_DCFE, 0x1032_5476, 0xC3D2_E1F0];

impl Sha1 {
    /// Create a fresh digest state.
    pub fn new() -> Self {
        Self {
            state: INITIAL_STATE,
            buffer: [0u8; 64],
            buffer_len: 0,
            length_bytes: 0,
            finalized: false,
        }
    }

    /// Reset to the initial state so the instance can be reused.
    pub fn reset(&mut self) {
        self.state = INITIAL_STATE;
        self.buffer = [0u8; 64];
        self.buffer_len = 0;
        self.length_bytes = 0;
        self.finalized = false;
    }

    /// Append bytes to the running digest. Order-sensitive.
    ///
    /// # Panics
    ///
    /// Panics if the instance was finalized without a [`reset`](Sha1::reset).
    /// A wrong digest is silently rejected downstream as unauthenticated, so
    /// contract misuse fails loudly here instead.
    pub fn update(&mut self, data: impl AsRef<[u8]>) {
        assert!(!self.finalized, "update after finalize; call reset first");
        let mut data = data.as_ref();
        self.length_bytes = self.length_bytes.wrapping_add(data.len() as u64);

        // Top up a partially filled buffer first.
        if self.buffer_len > 0 {
            let take = (64 - self.buffer_len).min(data.len());
            self.buffer[self.buffer_len..self.buffer_len + take].copy_from_slice(&data[..take]);
            self.buffer_len += take;
            data = &data[take..];
            if self.buffer_len == 64 {
                let block = self.buffer;
                self.compress(&block);
                self.buffer_len = 0;
            }
        }

        // Whole blocks straight from the input.
        while data.len() >= 64 {
            let mut block = [0u8; 64];
            block.copy_from_slice(&data[..64]);
            self.compress(&block);
            data = &data[64..];
        }

        if !data.is_empty() {
            self.buffer[..data.len()].copy_from_slice(data);
            self.buffer_len = data.len();
        }
    }

    /// Finalize the digest and return the 20-byte result.
    ///
    /// Valid once per instance; further use requires a `reset`.
    ///
    /// # Panics
    ///
    /// Panics if called twice without a [`reset`](Sha1::reset).
    pub fn finalize(&mut self) -> [u8; 20] {
        assert!(!self.finalized, "finalize called twice; call reset first");
        self.finalized = true;

        let bit_length = self.length_bytes.wrapping_mul(8);

        // Mandatory 0x80 terminator, then zero padding to 56 mod 64.
        let mut padding = [0u8; 72];
        padding[0] = 0x80;
        let pad_len = if self.buffer_len < 56 {
            56 - self.buffer_len
        } else {
            120 - self.buffer_len
        };

        // Feed padding and the big-endian bit length through the block path.
        let mut tail = Vec::with_capacity(pad_len + 8);
        tail.extend_from_slice(&padding[..pad_len]);
        tail.extend_from_slice(&bit_length.to_be_bytes());

        let mut data: &[u8] = &tail;
        if self.buffer_len > 0 {
            let take = 64 - self.buffer_len;
            self.buffer[self.buffer_len..].copy_from_slice(&data[..take]);
            let block = self.buffer;
            self.compress(&block);
            self.buffer_len = 0;
            data = &data[take..];
        }
        while data.len() >= 64 {
            let mut block = [0u8; 64];
            block.copy_from_slice(&data[..64]);
            self.compress(&block);
            data = &data[64..];
        }
        debug_assert!(data.is_empty());

        let mut digest = [0u8; 20];
        for (i, word) in self.state.iter().enumerate() {
            digest[i * 4..i * 4 + 4].copy_from_slice(&word.to_be_bytes());
        }
        digest
    }

    /// Finalize and return the digest as a 40-character lowercase hex string.
    ///
    /// # Panics
    ///
    /// Same contract as [`finalize`](Sha1::finalize).
    pub fn finalize_hex(&mut self) -> String {
        let digest = self.finalize();
        let mut out = String::with_capacity(40);
        for byte in digest {
            out.push(char::from_digit((byte >> 4) as u32, 16).unwrap_or('0'));
            out.push(char::from_digit((byte & 0x0F) as u32, 16).unwrap_or('0'));
        }
        out
    }

    /// One 80-round compression over a 64-byte block.
    fn compress(&mut self, block: &[u8; 64]) {
        let mut w = [0u32; 80];
        for (i, chunk) in block.chunks_exact(4).enumerate() {
            w[i] = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        for i in 16..80 {
            w[i] = (w[i - 3] ^ w[i - 8] ^ w[i - 14] ^ w[i - 16]).rotate_left(1);
        }

        let [mut a, mut b, mut c, mut d, mut e] = self.state;

        for (i, &word) in w.iter().enumerate() {
            let (f, k) = match i {
                0..=19 => ((b & c) | (!b & d), 0x5A82_7999),
                20..=39 => (b ^ c ^ d, 0x6ED9_EBA1),
                40..=59 => ((b & c) | (b & d) | (c & d), 0x8F1B_BCDC),
                _ => (b ^ c ^ d, 0xCA62_C1D6),
            };
            let temp = a
                .rotate_left(5)
                .wrapping_add(f)
                .wrapping_add(e)
                .wrapping_add(k)
                .wrapping_add(word);
            e = d;
            d = c;
            c = b;
            b = a.rotate_left(30);
            a = temp;
        }

        self.state[0] = self.state[0].wrapping_add(a);
        self.state[1] = self.state[1].wrapping_add(b);
        self.state[2] = self.state[2].wrapping_add(c);
        self.state[3] = self.state[3].wrapping_add(d);
        self.state[4] = self.state[4].wrapping_add(e);
    }
}

impl Default for Sha1 {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot SHA-1 of the input, as a 40-character lowercase hex string.
///
/// Text input is digested as its UTF-8 bytes.
pub fn sha1_hex(input: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha1::new();
    hasher.update(input);
    hasher.finalize_hex()
}
