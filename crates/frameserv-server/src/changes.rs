use std::sync::{Arc, PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

/// The most recent reconfigure query and when it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRequest {
    pub query: String,
    pub received_at: SystemTime,
}

/// Single-slot store for the last `/new_render?` query.
///
/// Writes overwrite, reads never consume. Clones share the slot so the
/// embedding layer can read it from another thread; a reader sees either the
/// previous or the new value, never a torn one.
#[derive(Debug, Clone)]
pub struct ChangeRequestBuffer {
    slot: Arc<RwLock<Option<ChangeRequest>>>,
    max_len: usize,
}

impl ChangeRequestBuffer {
    /// Create an empty buffer keeping at most `max_len` bytes of a query.
    pub fn new(max_len: usize) -> Self {
        Self {
            slot: Arc::new(RwLock::new(None)),
            max_len,
        }
    }

    /// Store `query`, truncated to the length bound.
    ///
    /// Queries that are empty, or empty once truncated, are refused and
    /// leave the previous value in place.
    pub fn set(&self, query: &str) -> bool {
        let query = truncate_at_char_boundary(query, self.max_len);
        if query.is_empty() {
            return false;
        }

        let query = query.to_string();
        let received_at = SystemTime::now();
        let unix_secs = received_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        info!(query = %query, received_at = unix_secs, "stored render change request");

        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(ChangeRequest { query, received_at });
        true
    }

    /// Copy of the stored query; empty if none was ever stored.
    pub fn get(&self) -> String {
        self.latest().map(|req| req.query).unwrap_or_default()
    }

    /// Stored query together with its receipt time.
    pub fn latest(&self) -> Option<ChangeRequest> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }
}

fn truncate_at_char_boundary(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_until_set() {
        let buffer = ChangeRequestBuffer::new(64);
        assert_eq!(buffer.get(), "");
        assert!(buffer.latest().is_none());
    }

    #[test]
    fn last_write_wins() {
        let buffer = ChangeRequestBuffer::new(64);
        assert!(buffer.set("quality=low"));
        assert!(buffer.set("quality=high"));
        assert_eq!(buffer.get(), "quality=high");
        // Reads are non-destructive.
        assert_eq!(buffer.get(), "quality=high");
    }

    #[test]
    fn empty_query_keeps_previous() {
        let buffer = ChangeRequestBuffer::new(64);
        buffer.set("frame=3");
        assert!(!buffer.set(""));
        assert_eq!(buffer.get(), "frame=3");
    }

    #[test]
    fn long_query_is_bounded() {
        let buffer = ChangeRequestBuffer::new(8);
        buffer.set("abcdefghijklmnop");
        assert_eq!(buffer.get(), "abcdefgh");

        // Never splits a multi-byte character.
        buffer.set("abcdefg\u{e9}z");
        assert_eq!(buffer.get(), "abcdefg");
    }

    #[test]
    fn query_truncated_to_nothing_is_refused() {
        let buffer = ChangeRequestBuffer::new(0);
        assert!(!buffer.set("quality=high"));
        assert!(buffer.latest().is_none());

        // A lone multi-byte character does not fit in two bytes.
        let buffer = ChangeRequestBuffer::new(2);
        buffer.set("ok");
        assert!(!buffer.set("\u{20ac}"));
        assert_eq!(buffer.get(), "ok");
    }

    #[test]
    fn clones_share_the_slot() {
        let buffer = ChangeRequestBuffer::new(64);
        let reader = buffer.clone();
        let before = SystemTime::now();
        buffer.set("scene=2");

        let latest = reader.latest().expect("request should be visible");
        assert_eq!(latest.query, "scene=2");
        assert!(latest.received_at >= before);
    }

    #[test]
    fn readable_from_another_thread() {
        let buffer = ChangeRequestBuffer::new(64);
        let reader = buffer.clone();
        buffer.set("end=10");
        let seen = std::thread::spawn(move || reader.get())
            .join()
            .expect("reader thread should finish");
        assert_eq!(seen, "end=10");
    }
}
