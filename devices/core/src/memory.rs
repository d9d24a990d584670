//! In-memory channel for exercising controllers without hardware.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::{BuzzError, Channel, DeviceInfo, Result, OUTPUT_REPORT_LEN};

#[derive(Debug, Default)]
struct Inner {
    reads: VecDeque<Vec<u8>>,
    read_errors: usize,
    writes: Vec<[u8; OUTPUT_REPORT_LEN]>,
    fail_writes: bool,
    closed: bool,
}

/// A scripted `Channel`.
///
/// Reports queued with [`MemoryChannel::push_read`] are handed out one per
/// read, after which reads report no data. Every write is recorded. Clones
/// share the same state, so a test can keep one handle and move the other
/// into a controller.
#[derive(Debug, Clone, Default)]
pub struct MemoryChannel {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw input report
    pub fn push_read(&self, report: impl Into<Vec<u8>>) {
        self.inner.lock().reads.push_back(report.into());
    }

    /// Make the next `count` reads fail before any queued report is returned
    pub fn push_read_errors(&self, count: usize) {
        self.inner.lock().read_errors += count;
    }

    /// Number of queued reports not read yet
    pub fn pending_reads(&self) -> usize {
        self.inner.lock().reads.len()
    }

    /// Every report written so far
    pub fn writes(&self) -> Vec<[u8; OUTPUT_REPORT_LEN]> {
        self.inner.lock().writes.clone()
    }

    /// The most recent report written, if any
    pub fn last_write(&self) -> Option<[u8; OUTPUT_REPORT_LEN]> {
        self.inner.lock().writes.last().copied()
    }

    /// Reject all writes from now on, as an unplugged device would
    pub fn fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

impl Channel for MemoryChannel {
    fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Ok(0);
        }
        if inner.read_errors > 0 {
            inner.read_errors -= 1;
            return Err(BuzzError::Io(std::io::Error::other("scripted read failure")));
        }
        match inner.reads.pop_front() {
            Some(report) => {
                let len = report.len().min(buf.len());
                buf[..len].copy_from_slice(&report[..len]);
                Ok(len)
            },
            None => Ok(0),
        }
    }

    fn write(&mut self, report: &[u8; OUTPUT_REPORT_LEN]) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(BuzzError::DeviceClosed);
        }
        if inner.fail_writes {
            return Err(BuzzError::WriteFailed("device disconnected".into()));
        }
        inner.writes.push(*report);
        Ok(())
    }

    fn close(&mut self) {
        self.inner.lock().closed = true;
    }

    fn info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo {
            path: "memory".into(),
            manufacturer: Some("Memory".into()),
            product: Some("Buzz".into()),
            serial: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_queued_reports_in_order_then_no_data() {
        let mut channel = MemoryChannel::new();
        channel.push_read([0u8, 0, 1, 0, 0]);
        channel.push_read([0u8, 0, 2, 0, 0]);

        let mut buf = [0u8; 5];
        assert_eq!(channel.read(&mut buf, Duration::ZERO).unwrap(), 5);
        assert_eq!(buf[2], 1);
        assert_eq!(channel.read(&mut buf, Duration::ZERO).unwrap(), 5);
        assert_eq!(buf[2], 2);
        assert_eq!(channel.read(&mut buf, Duration::ZERO).unwrap(), 0);
    }

    #[test]
    fn clones_share_recorded_writes() {
        let handle = MemoryChannel::new();
        let mut channel = handle.clone();
        channel.write(&[0, 0, 0xFF, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(handle.writes().len(), 1);
        assert_eq!(handle.last_write(), Some([0, 0, 0xFF, 0, 0, 0, 0, 0]));
    }

    #[test]
    fn closed_channel_rejects_writes_and_reads_nothing() {
        let mut channel = MemoryChannel::new();
        channel.push_read([0u8; 5]);
        channel.close();
        channel.close();

        let mut buf = [0u8; 5];
        assert_eq!(channel.read(&mut buf, Duration::ZERO).unwrap(), 0);
        assert!(matches!(channel.write(&[0; 8]), Err(BuzzError::DeviceClosed)));
        assert!(channel.is_closed());
    }

    #[test]
    fn failing_writes_are_not_recorded() {
        let mut channel = MemoryChannel::new();
        channel.fail_writes(true);
        assert!(matches!(channel.write(&[0; 8]), Err(BuzzError::WriteFailed(_))));
        assert!(channel.writes().is_empty());
    }
}
