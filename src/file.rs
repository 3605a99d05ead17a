//! Thin abstraction over an asynchronous file, backed by `tokio-uring`'s
//! submission-queue I/O — the same kernel-assisted approach the teacher
//! crate uses for its page reads/writes. Every operation hands the buffer
//! to the kernel and gets it back, matching `tokio-uring`'s ownership
//! contract (see `AlignedBuf` in the teacher crate for the O_DIRECT-grade
//! version of this; this writer's entries aren't page-aligned so a plain
//! `Vec<u8>`, which already implements `IoBuf`/`IoBufMut`, is sufficient).

use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_uring::fs::{File, OpenOptions};

/// `read`/`write`/`size`/`data_sync`/`truncate`, each a suspension point.
/// `?Send` because `tokio-uring`'s reactor is thread-local: its futures,
/// and therefore this trait's futures, are not `Send`.
#[async_trait(?Send)]
pub trait AsyncFile {
    async fn read(&self, buf: Vec<u8>, offset: u64) -> (io::Result<usize>, Vec<u8>);
    async fn write(&self, buf: Vec<u8>, offset: u64) -> (io::Result<usize>, Vec<u8>);
    async fn size(&self) -> io::Result<u64>;
    async fn data_sync(&self) -> io::Result<()>;
    async fn truncate(&self, len: u64) -> io::Result<()>;
}

/// An `AsyncFile` backed by a `tokio-uring` file handle.
pub struct UringFile {
    file: File,
    path: PathBuf,
}

impl UringFile {
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .await?;
        Ok(Self { file, path })
    }
}

#[async_trait(?Send)]
impl AsyncFile for UringFile {
    async fn read(&self, buf: Vec<u8>, offset: u64) -> (io::Result<usize>, Vec<u8>) {
        self.file.read_at(buf, offset).await
    }

    async fn write(&self, buf: Vec<u8>, offset: u64) -> (io::Result<usize>, Vec<u8>) {
        self.file.write_at(buf, offset).await
    }

    async fn size(&self) -> io::Result<u64> {
        // tokio-uring 0.5 has no async stat; a plain sync stat is the
        // pragmatic fallback every call site already treats as a
        // suspension point.
        Ok(std::fs::metadata(&self.path)?.len())
    }

    async fn data_sync(&self) -> io::Result<()> {
        self.file.sync_data().await
    }

    async fn truncate(&self, len: u64) -> io::Result<()> {
        let fd = self.file.as_raw_fd();
        let ret = unsafe { libc::ftruncate(fd, len as libc::off_t) };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}
