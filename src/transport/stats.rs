//! Tunnel counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, updated by the tunnel drivers and the send path.
#[derive(Debug, Default)]
pub struct TunnelStats {
    frames_sent: AtomicU64,
    bytes_submitted: AtomicU64,
    datagrams_in: AtomicU64,
    datagrams_out: AtomicU64,
    frames_decoded: AtomicU64,
    decode_errors: AtomicU64,
    resync_bytes: AtomicU64,
    overflows: AtomicU64,
    version_mismatches: AtomicU64,
    inbound_dropped: AtomicU64,
}

/// Point-in-time copy of [`TunnelStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TunnelStatsSnapshot {
    /// Frames handed to the primitive.
    pub frames_sent: u64,
    /// Bytes handed to the primitive, headers included.
    pub bytes_submitted: u64,
    /// UDP datagrams received.
    pub datagrams_in: u64,
    /// UDP datagrams sent.
    pub datagrams_out: u64,
    /// Frames decoded into application messages.
    pub frames_decoded: u64,
    /// Well-framed payloads that failed to decode.
    pub decode_errors: u64,
    /// Bytes discarded while resynchronizing.
    pub resync_bytes: u64,
    /// Reassembly buffer resets.
    pub overflows: u64,
    /// Messages carrying an unexpected protocol major version.
    pub version_mismatches: u64,
    /// Decoded messages dropped because the consumer fell behind.
    pub inbound_dropped: u64,
}

impl TunnelStats {
    pub(crate) fn record_sent(&self, frame_len: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_submitted
            .fetch_add(frame_len as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_datagram_in(&self) {
        self.datagrams_in.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_datagram_out(&self) {
        self.datagrams_out.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_scan(&self, decoded: usize, errors: usize, resync: usize) {
        self.frames_decoded
            .fetch_add(decoded as u64, Ordering::Relaxed);
        self.decode_errors.fetch_add(errors as u64, Ordering::Relaxed);
        self.resync_bytes.fetch_add(resync as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_overflow(&self) {
        self.overflows.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_version_mismatch(&self) {
        self.version_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_inbound_dropped(&self) {
        self.inbound_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current values.
    pub fn snapshot(&self) -> TunnelStatsSnapshot {
        TunnelStatsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_submitted: self.bytes_submitted.load(Ordering::Relaxed),
            datagrams_in: self.datagrams_in.load(Ordering::Relaxed),
            datagrams_out: self.datagrams_out.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            resync_bytes: self.resync_bytes.load(Ordering::Relaxed),
            overflows: self.overflows.load(Ordering::Relaxed),
            version_mismatches: self.version_mismatches.load(Ordering::Relaxed),
            inbound_dropped: self.inbound_dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_records() {
        let stats = TunnelStats::default();
        stats.record_sent(36);
        stats.record_sent(4);
        stats.record_scan(3, 1, 7);
        stats.record_overflow();
        stats.record_inbound_dropped();

        let snap = stats.snapshot();
        assert_eq!(snap.frames_sent, 2);
        assert_eq!(snap.bytes_submitted, 40);
        assert_eq!(snap.frames_decoded, 3);
        assert_eq!(snap.decode_errors, 1);
        assert_eq!(snap.resync_bytes, 7);
        assert_eq!(snap.overflows, 1);
        assert_eq!(snap.inbound_dropped, 1);
        assert_eq!(snap.datagrams_in, 0);
    }
}
