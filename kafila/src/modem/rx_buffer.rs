//! Fixed-capacity receive buffer shared by command responses and inbound frames

/// Capacity of the modem receive buffer
pub const RX_BUFFER_SIZE: usize = 1024;

/// Append-only byte buffer with overflow detection
///
/// Bytes that do not fit are not partially stored: the whole buffer is
/// discarded and the overflow flag raised, so a consumer never parses a
/// frame whose middle was dropped.
pub struct RxBuffer<const N: usize = RX_BUFFER_SIZE> {
    data: [u8; N],
    len: usize,
    overflowed: bool,
}

impl<const N: usize> RxBuffer<N> {
    pub fn new() -> Self {
        Self {
            data: [0; N],
            len: 0,
            overflowed: false,
        }
    }

    /// Append received bytes
    ///
    /// Returns `false` if the bytes did not fit and the buffer was reset.
    pub fn extend(&mut self, bytes: &[u8]) -> bool {
        let end = self.len + bytes.len();
        if end > N {
            self.len = 0;
            self.overflowed = true;
            return false;
        }
        self.data[self.len..end].copy_from_slice(bytes);
        self.len = end;
        true
    }

    /// Filled portion of the buffer
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remaining free space
    #[inline]
    pub fn remaining(&self) -> usize {
        N - self.len
    }

    /// Reset the write cursor
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Report and reset the overflow flag
    pub fn take_overflow(&mut self) -> bool {
        std::mem::take(&mut self.overflowed)
    }

    /// Substring search over the filled portion
    pub fn contains(&self, needle: &[u8]) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.as_slice().windows(needle.len()).any(|w| w == needle)
    }
}

impl<const N: usize> Default for RxBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
