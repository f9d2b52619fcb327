#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("FS: {0}")]
    Fs(#[from] FsError),
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    #[error("no such file or directory")]
    NotFound,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("file or directory already exists")]
    AlreadyExists,
    #[error("directory not empty")]
    NotEmpty,
    #[error("device or resource busy")]
    Busy,
    #[error("no space left on device")]
    NoSpace,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("filesystem structure is corrupt")]
    Corrupt,
}

impl Error {
    /// Negative-POSIX-errno mapping consumed by the upcall layer.
    pub fn to_errno(&self) -> i32 {
        match self {
            Error::Io(_) => libc::EIO,
            Error::Fs(e) => e.to_errno(),
        }
    }
}

impl FsError {
    pub fn to_errno(self) -> i32 {
        use FsError::*;
        match self {
            NotFound => libc::ENOENT,
            NotADirectory => libc::ENOTDIR,
            IsADirectory => libc::EISDIR,
            AlreadyExists => libc::EEXIST,
            NotEmpty => libc::ENOTEMPTY,
            Busy => libc::EBUSY,
            NoSpace => libc::ENOSPC,
            InvalidArgument => libc::EINVAL,
            Corrupt => libc::EIO,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
