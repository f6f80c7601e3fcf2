use std::cell::{Cell, RefCell};
use std::ffi::CString;
use std::os::raw::c_char;

use frameserv_server::ServerError;
use frameserv_transport::TransportError;

use crate::types::FsResult;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
    static LAST_CODE: Cell<FsResult> = const { Cell::new(FsResult::Ok) };
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| *state.borrow_mut() = CString::default());
    LAST_CODE.with(|code| code.set(FsResult::Ok));
}

pub(crate) fn set_error(code: FsResult, message: impl Into<String>) {
    let sanitized = message.into().replace('\0', "?");
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::new(sanitized).unwrap_or_default();
    });
    LAST_CODE.with(|cell| cell.set(code));
}

pub(crate) fn set_invalid_argument(message: impl Into<String>) -> FsResult {
    set_error(FsResult::InvalidArgument, message);
    FsResult::InvalidArgument
}

pub(crate) fn set_panic_error() {
    set_error(FsResult::Internal, "panic across FFI boundary");
}

pub(crate) fn map_server_error(err: &ServerError) -> FsResult {
    let code = match err {
        ServerError::Transport(TransportError::Timeout(_)) | ServerError::Timeout(_) => {
            FsResult::Timeout
        }
        ServerError::Transport(TransportError::NotListening) => FsResult::NotRunning,
        ServerError::Transport(_) | ServerError::Recv(_) => FsResult::TransportError,
        ServerError::Pixmap(_) => FsResult::PixmapError,
        ServerError::Send(_) => FsResult::SendFailed,
        ServerError::Disconnected => FsResult::Disconnected,
        ServerError::InvalidRange { .. } => FsResult::InvalidArgument,
        ServerError::NoRenderSession => FsResult::NoRender,
    };
    set_error(code, err.to_string());
    code
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}

pub(crate) fn last_error_code() -> FsResult {
    LAST_CODE.with(Cell::get)
}
