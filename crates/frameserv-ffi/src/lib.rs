//! frameserv-ffi: C-ABI exports for embedding the frame server in a render host.
//!
//! The host owns the render loop. It starts the server once, then for every
//! render calls `fs_render_begin`, loops on `fs_render_next_frame` /
//! `fs_render_append` while `fs_render_aborted` is false, and finishes with
//! `fs_render_end`. A scripting layer reads reconfigure requests through
//! `fs_get_last_request`.

mod error;
mod server;
mod types;

use std::panic::AssertUnwindSafe;

pub use server::{
    fs_get_last_request, fs_render_aborted, fs_render_append, fs_render_begin, fs_render_end,
    fs_render_next_frame, fs_server_port, fs_server_start, fs_server_stop, fs_set_continuous_mode,
};
pub use types::{
    FsResult, FS_ERR_DISCONNECTED, FS_ERR_INTERNAL, FS_ERR_INVALID_ARGUMENT, FS_ERR_NOT_RUNNING,
    FS_ERR_NO_RENDER, FS_ERR_PIXMAP, FS_ERR_SEND_FAILED, FS_ERR_TIMEOUT, FS_ERR_TRANSPORT, FS_OK,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

#[no_mangle]
pub extern "C" fn fs_init() -> FsResult {
    ffi_boundary(FsResult::Internal, || {
        error::clear_error_state();
        FsResult::Ok
    })
}

/// Message of the last failed call on this thread; empty if it succeeded.
///
/// The pointer stays valid until the next call on the same thread.
#[no_mangle]
pub extern "C" fn fs_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}

/// Result code of the last failed call on this thread.
#[no_mangle]
pub extern "C" fn fs_last_error_code() -> FsResult {
    ffi_boundary(FsResult::Internal, error::last_error_code)
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;

    #[test]
    fn init_clears_error_state() {
        error::set_error(FsResult::Timeout, "stale");
        assert_eq!(fs_init(), FsResult::Ok);
        assert_eq!(fs_last_error_code(), FsResult::Ok);
    }

    #[test]
    fn last_error_returns_non_null_pointer() {
        fs_init();
        let ptr = fs_last_error();
        assert!(!ptr.is_null());

        // SAFETY: fs_last_error returns a pointer to a thread-local CString.
        let text = unsafe { CStr::from_ptr(ptr).to_str().unwrap() };
        assert!(text.is_empty());
    }

    #[test]
    fn panics_are_contained() {
        let value = ffi_boundary(7, || panic!("boom"));
        assert_eq!(value, 7);
        assert_eq!(fs_last_error_code(), FsResult::Internal);
    }
}
