use tracing::debug;

use crate::abort::AbortToken;
use crate::advance::FrameAdvancer;
use crate::changes::ChangeRequestBuffer;
use crate::request::Request;

const GET_PREFIX: &[u8] = b"GET ";
const RECONFIGURE_PREFIX: &[u8] = b"/new_render?";
const STREAM_ALL_PREFIX: &[u8] = b"/images/ppm/all";
const FRAME_PREFIX: &[u8] = b"/images/ppm/";

/// How frames are handed to the connected peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamMode {
    /// One request, one frame, one connection.
    #[default]
    SingleFrame,
    /// Consecutive frames on one connection until the range runs out.
    Continuous,
}

/// What to do with one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    IndexPage,
    InfoPage,
    /// The query was handed to the change-request buffer; `accepted` is
    /// false when it was refused (empty or not UTF-8).
    Reconfigure { accepted: bool },
    /// Render and stream this frame.
    Frame(i32),
    Close,
    NoRoute,
}

impl RouteDecision {
    /// Whether the connection is closed right after the response.
    pub fn closes_connection(&self) -> bool {
        !matches!(self, RouteDecision::Frame(_))
    }
}

/// Session state a request may touch.
pub struct RouteContext<'a> {
    pub advancer: Option<&'a mut FrameAdvancer>,
    pub changes: &'a ChangeRequestBuffer,
    pub abort: &'a AbortToken,
    pub mode: &'a mut StreamMode,
}

/// Map a request to exactly one decision, applying its side effects.
pub fn route(request: &Request, ctx: &mut RouteContext<'_>) -> RouteDecision {
    if request.is_empty() {
        return next_from_cursor(ctx);
    }
    let Request::Raw(raw) = request else {
        return RouteDecision::NoRoute;
    };

    let Some(rest) = raw.strip_prefix(GET_PREFIX) else {
        debug!("request is not a GET");
        return RouteDecision::NoRoute;
    };
    let path = request_path(rest);
    debug!(path = %String::from_utf8_lossy(path), "routing request");

    if path == b"/" || path == b"/index.html" {
        return RouteDecision::IndexPage;
    }
    if path == b"/info.txt" {
        return RouteDecision::InfoPage;
    }
    if let Some(query) = path.strip_prefix(RECONFIGURE_PREFIX) {
        let accepted = std::str::from_utf8(query)
            .map(|query| ctx.changes.set(query))
            .unwrap_or(false);
        ctx.abort.trigger();
        return RouteDecision::Reconfigure { accepted };
    }
    if path.starts_with(STREAM_ALL_PREFIX) {
        *ctx.mode = StreamMode::Continuous;
        return next_from_cursor(ctx);
    }
    if let Some(suffix) = path.strip_prefix(FRAME_PREFIX) {
        return parse_frame_number(suffix).map_or(RouteDecision::NoRoute, RouteDecision::Frame);
    }
    if path == b"/close.txt" {
        ctx.abort.trigger();
        return RouteDecision::Close;
    }
    RouteDecision::NoRoute
}

fn next_from_cursor(ctx: &mut RouteContext<'_>) -> RouteDecision {
    match ctx.advancer.as_deref_mut().map(FrameAdvancer::next) {
        Some(Ok(frame)) => RouteDecision::Frame(frame),
        Some(Err(_)) | None => RouteDecision::NoRoute,
    }
}

/// Bytes after `GET ` up to the first space or line break.
fn request_path(rest: &[u8]) -> &[u8] {
    let end = rest
        .iter()
        .position(|&b| matches!(b, b' ' | b'\r' | b'\n' | 0))
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Leading decimal number of a path suffix, so `42` and `42.ppm` both name frame 42.
fn parse_frame_number(suffix: &[u8]) -> Option<i32> {
    let (negative, digits) = match suffix.first() {
        Some(b'-') => (true, &suffix[1..]),
        Some(b'+') => (false, &suffix[1..]),
        _ => (false, suffix),
    };
    let len = digits.iter().take_while(|b| b.is_ascii_digit()).count();
    if len == 0 {
        return None;
    }
    let magnitude = digits[..len].iter().try_fold(0i64, |acc, &d| {
        acc.checked_mul(10)?.checked_add(i64::from(d - b'0'))
    })?;
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).ok()
}
