/// Outcome of the most recent call on the calling thread.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsResult {
    Ok = 0,
    InvalidArgument = 1,
    TransportError = 2,
    PixmapError = 3,
    Disconnected = 4,
    Timeout = 5,
    NotRunning = 6,
    NoRender = 7,
    SendFailed = 8,
    Internal = 99,
}

#[allow(dead_code)]
pub const FS_OK: FsResult = FsResult::Ok;
#[allow(dead_code)]
pub const FS_ERR_INVALID_ARGUMENT: FsResult = FsResult::InvalidArgument;
#[allow(dead_code)]
pub const FS_ERR_TRANSPORT: FsResult = FsResult::TransportError;
#[allow(dead_code)]
pub const FS_ERR_PIXMAP: FsResult = FsResult::PixmapError;
#[allow(dead_code)]
pub const FS_ERR_DISCONNECTED: FsResult = FsResult::Disconnected;
#[allow(dead_code)]
pub const FS_ERR_TIMEOUT: FsResult = FsResult::Timeout;
#[allow(dead_code)]
pub const FS_ERR_NOT_RUNNING: FsResult = FsResult::NotRunning;
#[allow(dead_code)]
pub const FS_ERR_NO_RENDER: FsResult = FsResult::NoRender;
#[allow(dead_code)]
pub const FS_ERR_SEND_FAILED: FsResult = FsResult::SendFailed;
#[allow(dead_code)]
pub const FS_ERR_INTERNAL: FsResult = FsResult::Internal;
