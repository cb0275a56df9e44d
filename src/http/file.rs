//! Uploaded files
//!
//! Files are buffered in memory until they grow past
//! [`UploadConfig::max_memory`], after which the buffer and the rest of the
//! stream are written to a temporary file. Either way the resulting [`File`]
//! can be read and seeked like a regular file.

use bytes::{Bytes, BytesMut};
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::config::UploadConfig;
use crate::http::sniff::{self, SNIFF_LEN};

/// A file extracted from a request.
///
/// A file spilled to disk is deleted when the `File` is dropped, unless it
/// was detached with [`File::keep`].
#[derive(Debug)]
pub struct File {
    field: String,
    file_name: Option<String>,
    content_type: String,
    size: u64,
    backing: Backing,
}

#[derive(Debug)]
enum Backing {
    Memory(Cursor<Bytes>),
    Disk(NamedTempFile),
}

impl File {
    /// The form field the file was submitted under.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The file name sent by the client, for multipart uploads.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// The sniffed content type, including parameters such as the charset.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The sniffed content type without parameters, e.g. `text/plain`.
    pub fn mime_type(&self) -> &str {
        self.content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self.backing, Backing::Memory(_))
    }

    /// Path of the temporary file backing this upload, if it was spilled.
    pub fn path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::Memory(_) => None,
            Backing::Disk(tmp) => Some(tmp.path()),
        }
    }

    /// Read the whole file, regardless of the current read position.
    pub async fn bytes(self) -> io::Result<Bytes> {
        match self.backing {
            Backing::Memory(cursor) => Ok(cursor.into_inner()),
            Backing::Disk(tmp) => tokio::fs::read(tmp.path()).await.map(Bytes::from),
        }
    }

    /// Delete the temporary file now instead of on drop.
    pub fn remove(self) -> io::Result<()> {
        match self.backing {
            Backing::Memory(_) => Ok(()),
            Backing::Disk(tmp) => tmp.close(),
        }
    }

    /// Detach the temporary file so it outlives this value.
    ///
    /// Returns `None` for files held in memory. The caller owns the returned
    /// path and is responsible for deleting it.
    pub fn keep(self) -> io::Result<Option<PathBuf>> {
        match self.backing {
            Backing::Memory(_) => Ok(None),
            Backing::Disk(tmp) => {
                let (_, path) = tmp.keep().map_err(|e| e.error)?;
                Ok(Some(path))
            }
        }
    }
}

impl Read for File {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.backing {
            Backing::Memory(cursor) => cursor.read(buf),
            Backing::Disk(tmp) => tmp.read(buf),
        }
    }
}

impl Seek for File {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match &mut self.backing {
            Backing::Memory(cursor) => cursor.seek(pos),
            Backing::Disk(tmp) => tmp.seek(pos),
        }
    }
}

/// Collects the chunks of an upload, spilling to disk past the memory limit.
pub(crate) struct Spool<'a> {
    config: &'a UploadConfig,
    head: Vec<u8>,
    buf: BytesMut,
    disk: Option<(NamedTempFile, tokio::fs::File)>,
    size: u64,
}

impl<'a> Spool<'a> {
    pub(crate) fn new(config: &'a UploadConfig) -> Self {
        Self {
            config,
            head: Vec::with_capacity(SNIFF_LEN),
            buf: BytesMut::new(),
            disk: None,
            size: 0,
        }
    }

    pub(crate) async fn push(&mut self, chunk: Bytes) -> io::Result<()> {
        self.size += chunk.len() as u64;

        if self.head.len() < SNIFF_LEN {
            let take = (SNIFF_LEN - self.head.len()).min(chunk.len());
            self.head.extend_from_slice(&chunk[..take]);
        }

        if let Some((_, out)) = &mut self.disk {
            return out.write_all(&chunk).await;
        }

        self.buf.extend_from_slice(&chunk);
        if self.buf.len() as u64 > self.config.max_memory {
            self.spill().await?;
        }
        Ok(())
    }

    async fn spill(&mut self) -> io::Result<()> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(&self.config.temp_prefix);

        let tmp = match &self.config.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        tracing::debug!(
            path = %tmp.path().display(),
            buffered = self.buf.len(),
            limit = self.config.max_memory,
            "Upload exceeds memory limit, spilling to disk"
        );

        let mut out = tokio::fs::File::from_std(tmp.reopen()?);
        out.write_all(&self.buf).await?;
        self.buf = BytesMut::new();
        self.disk = Some((tmp, out));
        Ok(())
    }

    /// Finish the upload. Returns `None` when nothing was received.
    pub(crate) async fn finish(self, field: impl Into<String>, file_name: Option<String>) -> io::Result<Option<File>> {
        if self.size == 0 {
            return Ok(None);
        }

        let backing = match self.disk {
            Some((mut tmp, mut out)) => {
                out.flush().await?;
                drop(out);
                tmp.seek(SeekFrom::Start(0))?;
                tracing::debug!(size = self.size, path = %tmp.path().display(), "Upload written to disk");
                Backing::Disk(tmp)
            }
            None => Backing::Memory(Cursor::new(self.buf.freeze())),
        };

        Ok(Some(File {
            field: field.into(),
            file_name,
            content_type: sniff::detect_content_type(&self.head).to_string(),
            size: self.size,
            backing,
        }))
    }
}

/// Format a byte count with a binary unit, truncating the fraction.
///
/// ```
/// use tideway_forms::http::human_size;
///
/// assert_eq!(human_size(1536), "1 KB");
/// assert_eq!(human_size(1048576), "1 MB");
/// ```
pub fn human_size(n: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    let mut n = n;
    let mut unit = 0;
    while n >= 1024 && unit < UNITS.len() - 1 {
        n /= 1024;
        unit += 1;
    }
    format!("{} {}", n, UNITS[unit])
}
