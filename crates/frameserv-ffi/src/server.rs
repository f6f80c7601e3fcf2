use std::os::raw::c_char;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use frameserv_server::{
    AbortToken, ChangeRequestBuffer, FrameServer, RenderRange, ServerConfig,
    DEFAULT_MAX_CHANGE_REQUEST_LEN,
};
use tracing::debug;

use crate::error;
use crate::types::FsResult;

/// The process-wide server. At most one exists at any time.
static SERVER: Mutex<Option<FrameServer>> = Mutex::new(None);

static CONTINUOUS: AtomicBool = AtomicBool::new(false);

/// Outlives server restarts; readable without taking the server lock.
fn change_requests() -> &'static ChangeRequestBuffer {
    static CHANGES: OnceLock<ChangeRequestBuffer> = OnceLock::new();
    CHANGES.get_or_init(|| ChangeRequestBuffer::new(DEFAULT_MAX_CHANGE_REQUEST_LEN))
}

/// Polled by the host between frames; readable without taking the server lock.
fn abort_token() -> &'static AbortToken {
    static ABORT: OnceLock<AbortToken> = OnceLock::new();
    ABORT.get_or_init(AbortToken::new)
}

fn lock_server() -> MutexGuard<'static, Option<FrameServer>> {
    SERVER.lock().unwrap_or_else(PoisonError::into_inner)
}

fn with_server<T>(on_error: T, f: impl FnOnce(&mut FrameServer) -> T) -> T {
    let mut guard = lock_server();
    match guard.as_mut() {
        Some(server) => f(server),
        None => {
            error::set_error(FsResult::NotRunning, "frame server is not running");
            on_error
        }
    }
}

/// Start listening on `port` (0 picks a free port).
///
/// Returns true when the server is listening, including when it already was.
#[no_mangle]
pub extern "C" fn fs_server_start(port: u16) -> bool {
    crate::ffi_boundary(false, || {
        error::clear_error_state();

        let mut guard = lock_server();
        if guard.as_ref().is_some_and(FrameServer::is_listening) {
            return true;
        }

        let config = ServerConfig::default().with_port(port);
        let mut server = FrameServer::new(config).with_change_requests(change_requests().clone());
        server.set_continuous_mode(CONTINUOUS.load(Ordering::SeqCst));
        match server.start_listening() {
            Ok(addr) => {
                debug!(%addr, "embedded frame server started");
                *guard = Some(server);
                true
            }
            Err(err) => {
                error::map_server_error(&err);
                false
            }
        }
    })
}

/// Close the peer and the listening socket. Safe to call when not running.
#[no_mangle]
pub extern "C" fn fs_server_stop() {
    crate::ffi_boundary((), || {
        error::clear_error_state();
        if let Some(mut server) = lock_server().take() {
            server.stop_listening();
        }
    });
}

/// Port the server is bound to, or 0 when not running.
#[no_mangle]
pub extern "C" fn fs_server_port() -> u16 {
    crate::ffi_boundary(0, || {
        lock_server()
            .as_ref()
            .and_then(FrameServer::local_addr)
            .map_or(0, |addr| addr.port())
    })
}

/// Choose continuous streaming (true) or one frame per request (false).
///
/// Applies to the running server and to any server started later.
#[no_mangle]
pub extern "C" fn fs_set_continuous_mode(continuous: bool) {
    crate::ffi_boundary((), || {
        CONTINUOUS.store(continuous, Ordering::SeqCst);
        if let Some(server) = lock_server().as_mut() {
            server.set_continuous_mode(continuous);
        }
    });
}

/// Copy the last reconfigure query into `dest` as a NUL-terminated string.
///
/// At most `cap - 1` bytes are copied. Returns the full length of the stored
/// query, so a return value `>= cap` means the copy was truncated.
///
/// # Safety
/// If `cap > 0`, `dest` must be non-null and writable for `cap` bytes.
#[no_mangle]
pub unsafe extern "C" fn fs_get_last_request(dest: *mut c_char, cap: usize) -> usize {
    crate::ffi_boundary(0, || {
        error::clear_error_state();
        let query = change_requests().get();
        if cap == 0 {
            return query.len();
        }
        if dest.is_null() {
            let _ = error::set_invalid_argument("dest cannot be null when cap > 0");
            return 0;
        }

        let n = query.len().min(cap - 1);
        // SAFETY: `dest` is writable for `cap` bytes and `n < cap`.
        unsafe {
            std::ptr::copy_nonoverlapping(query.as_ptr(), dest.cast::<u8>(), n);
            *dest.add(n) = 0;
        }
        query.len()
    })
}

/// Start serving a render of frames `start..=end` at `width` x `height`.
#[no_mangle]
pub extern "C" fn fs_render_begin(start: i32, end: i32, rate: i32, width: u32, height: u32) -> bool {
    crate::ffi_boundary(false, || {
        error::clear_error_state();
        with_server(false, |server| {
            let abort = abort_token();
            abort.reset();
            let result = RenderRange::new(start, end, rate)
                .and_then(|range| server.begin_render(range, width, height, abort.clone()));
            match result {
                Ok(()) => true,
                Err(err) => {
                    error::map_server_error(&err);
                    false
                }
            }
        })
    })
}

/// Ask the connected peer which frame to render next (blocking).
///
/// Returns true and stores the frame in `out_frame` when one must be
/// rendered and passed to [`fs_render_append`]. Returns false when this
/// iteration produced no frame; check [`fs_render_aborted`] before retrying.
///
/// # Safety
/// `out_frame` must be non-null and writable.
#[no_mangle]
pub unsafe extern "C" fn fs_render_next_frame(out_frame: *mut i32) -> bool {
    crate::ffi_boundary(false, || {
        error::clear_error_state();
        if out_frame.is_null() {
            let _ = error::set_invalid_argument("out_frame cannot be null");
            return false;
        }

        with_server(false, |server| match server.next_frame_request() {
            Ok(Some(frame)) if server.render_range().is_some_and(|r| r.contains(frame)) => {
                // SAFETY: checked non-null above; the caller guarantees writability.
                unsafe { *out_frame = frame };
                true
            }
            Ok(Some(frame)) => {
                debug!(frame, "requested frame outside render range");
                server.discard_pending_frame();
                false
            }
            Ok(None) => false,
            Err(err) => {
                error::map_server_error(&err);
                false
            }
        })
    })
}

/// Stream the rendered `frame` to the peer.
///
/// `pixels` holds `width * height` RGBA pixels, bottom row first. Returns
/// false if streaming failed; the render is then aborted.
///
/// # Safety
/// `pixels` must be non-null and readable for `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn fs_render_append(
    pixels: *const u8,
    len: usize,
    width: u32,
    height: u32,
    frame: i32,
) -> bool {
    crate::ffi_boundary(false, || {
        error::clear_error_state();
        if pixels.is_null() {
            let _ = error::set_invalid_argument("pixels cannot be null");
            return false;
        }
        // SAFETY: checked non-null above; the caller guarantees `len` readable bytes.
        let pixels = unsafe { std::slice::from_raw_parts(pixels, len) };

        with_server(false, |server| {
            match server.append_frame(pixels, width, height, frame) {
                Ok(_) => true,
                Err(err) => {
                    error::map_server_error(&err);
                    false
                }
            }
        })
    })
}

/// Finish the render: the peer is closed, the listening socket stays open.
#[no_mangle]
pub extern "C" fn fs_render_end() {
    crate::ffi_boundary((), || {
        if let Some(server) = lock_server().as_mut() {
            server.end_render();
        }
    });
}

/// Whether the render loop must stop producing frames.
#[no_mangle]
pub extern "C" fn fs_render_aborted() -> bool {
    crate::ffi_boundary(true, || abort_token().is_triggered())
}
