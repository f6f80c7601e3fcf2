use tracing::debug;

use crate::abort::AbortToken;
use crate::config::RenderRange;

/// Returned by [`FrameAdvancer::next`] once every frame of the range was handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeExhausted;

impl std::fmt::Display for RangeExhausted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("render range exhausted")
    }
}

impl std::error::Error for RangeExhausted {}

/// Next-frame cursor for continuous streaming.
///
/// The cursor stays within `start..=end + 1`. Running past `end` is the
/// normal way a continuous stream ends: the advancer reports it and triggers
/// the abort token so the render loop stops.
#[derive(Debug)]
pub struct FrameAdvancer {
    range: RenderRange,
    cursor: i64,
    abort: AbortToken,
}

impl FrameAdvancer {
    pub fn new(range: RenderRange, abort: AbortToken) -> Self {
        Self {
            range,
            cursor: i64::from(range.start()),
            abort,
        }
    }

    /// Hand out the current frame number and move past it.
    pub fn next(&mut self) -> Result<i32, RangeExhausted> {
        if self.cursor > i64::from(self.range.end()) {
            debug!(end = self.range.end(), "render range exhausted");
            self.abort.trigger();
            return Err(RangeExhausted);
        }
        let frame = self.cursor as i32;
        self.cursor += 1;
        Ok(frame)
    }

    /// The frame [`next`](Self::next) would return, or `end + 1` once exhausted.
    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    pub fn range(&self) -> RenderRange {
        self.range
    }

    /// Signal the render loop to stop without touching the cursor.
    pub fn abort(&self) {
        self.abort.trigger();
    }

    pub fn abort_token(&self) -> &AbortToken {
        &self.abort
    }
}
