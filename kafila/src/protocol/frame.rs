//! Extraction of datagram notifications from the modem byte stream

use super::cursor::Cursor;

/// Marker preceding every received datagram
pub const FRAME_MARKER: &[u8] = b"+IPD,";
/// Frames handled per pass over the receive buffer
pub const MAX_FRAMES_PER_PASS: usize = 10;
/// Exclusive upper bound on a declared payload length
pub const MAX_PAYLOAD_LEN: usize = 500;

/// Logical channel a datagram arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Base station commands addressed to this vehicle
    Unicast,
    /// Peer broadcasts and broadcast commands
    Broadcast,
}

impl Channel {
    pub fn from_link_id(id: usize) -> Option<Self> {
        match id {
            0 => Some(Channel::Unicast),
            1 => Some(Channel::Broadcast),
            _ => None,
        }
    }
}

/// One `+IPD,<channel>,<length>:<payload>` datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub channel: Channel,
    pub payload: &'a [u8],
}

/// Iterator over the complete frames in a receive buffer
///
/// Frames whose declared payload runs past the filled buffer end the scan.
pub struct FrameScanner<'a> {
    cursor: Cursor<'a>,
    yielded: usize,
}

impl<'a> FrameScanner<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(buf),
            yielded: 0,
        }
    }
}

impl<'a> Iterator for FrameScanner<'a> {
    type Item = Frame<'a>;

    fn next(&mut self) -> Option<Frame<'a>> {
        if self.yielded >= MAX_FRAMES_PER_PASS {
            return None;
        }
        loop {
            if !self.cursor.seek_past(FRAME_MARKER) {
                return None;
            }
            let Some(link_id) = self.cursor.number_until(b',') else {
                log::debug!("Frame with malformed channel dropped");
                continue;
            };
            let Some(len) = self.cursor.number_until(b':') else {
                log::debug!("Frame with malformed length dropped");
                continue;
            };
            if len == 0 || len >= MAX_PAYLOAD_LEN {
                log::debug!("Frame with implausible length {} dropped", len);
                continue;
            }
            let Some(payload) = self.cursor.take(len) else {
                log::debug!("Truncated frame ({} bytes declared) dropped", len);
                return None;
            };
            match Channel::from_link_id(link_id) {
                Some(channel) => {
                    self.yielded += 1;
                    return Some(Frame { channel, payload });
                }
                None => log::debug!("Frame on unknown link {} dropped", link_id),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concatenated_frames() {
        let buf = b"\r\n+IPD,0,5:[F,T]\r\n+IPD,1,3:abc";
        let frames: Vec<_> = FrameScanner::new(buf).collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].channel, Channel::Unicast);
        assert_eq!(frames[0].payload, b"[F,T]");
        assert_eq!(frames[1].channel, Channel::Broadcast);
        assert_eq!(frames[1].payload, b"abc");
    }

    #[test]
    fn test_truncated_tail_rejected() {
        let buf = b"+IPD,1,3:abc+IPD,1,10:short";
        let frames: Vec<_> = FrameScanner::new(buf).collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, b"abc");
    }

    #[test]
    fn test_malformed_header_skipped() {
        let buf = b"+IPD,x,3:abc+IPD,1,0:+IPD,7,1:z+IPD,1,2:ok";
        let frames: Vec<_> = FrameScanner::new(buf).collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, b"ok");
    }

    #[test]
    fn test_frames_per_pass_capped() {
        let buf = b"+IPD,1,1:a".repeat(15);
        assert_eq!(FrameScanner::new(&buf).count(), MAX_FRAMES_PER_PASS);
    }
}
