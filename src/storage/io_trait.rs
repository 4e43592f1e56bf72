use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use async_trait::async_trait;
use log::{error, trace};
use tokio::io::AsyncReadExt;
use tokio::{fs, io};
use uuid::Uuid;
use crate::rng::make_uuid;

const TMP_FILENAME_INFIX: &str = ".tmp.";

pub struct ReadFile {
    pub data: String,
    /// Size on disk, may exceed what was read.
    pub size: u64,
}

#[async_trait]
pub trait StorageIo: Send + Sync + 'static {
    /// `None` if the file does not exist.
    async fn read_file(
        &self,
        path: &Path,
        limit: u64,
    ) -> io::Result<Option<ReadFile>>;

    async fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    async fn rename_file(&self, from: &Path, to: &Path) -> io::Result<()>;

    async fn remove_file(&self, path: &Path) -> io::Result<()>;

    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    async fn list_dir(&self, path: &Path) -> io::Result<Vec<OsString>>;

    fn generate_uuid(&self) -> Uuid;
}

pub struct ProductionStorageIo;

impl ProductionStorageIo {
    pub fn new() -> Self {
        ProductionStorageIo
    }
}

impl Default for ProductionStorageIo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageIo for ProductionStorageIo {
    async fn read_file(
        &self,
        path: &Path,
        limit: u64,
    ) -> io::Result<Option<ReadFile>> {
        let file = match fs::File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let size = file.metadata().await?.len();
        let data = read_limited_utf8_lossy(limit, file).await?;
        Ok(Some(ReadFile { data, size }))
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        fs::write(path, data).await
    }

    async fn rename_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to).await
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path).await
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path).await
    }

    async fn list_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        let mut read = fs::read_dir(path).await?;
        let mut ret = Vec::new();
        while let Some(entry) = read.next_entry().await? {
            ret.push(entry.file_name());
        }
        Ok(ret)
    }

    fn generate_uuid(&self) -> Uuid {
        make_uuid(&mut rand::rng())
    }
}

async fn read_limited_utf8_lossy<R: io::AsyncRead + Unpin + Send>(
    limit: u64,
    reader: R,
) -> Result<String, io::Error> {
    let mut buf = Vec::new();
    io::BufReader::new(reader).take(limit).read_to_end(&mut buf).await?;
    Ok(
        String::from_utf8_lossy(&buf)
            .replace(std::char::REPLACEMENT_CHARACTER, "")
    )
}

pub fn tmp_path(io: &impl StorageIo, path: &Path) -> PathBuf {
    let mut name = path.file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(TMP_FILENAME_INFIX);
    name.push(io.generate_uuid().hyphenated().to_string());
    path.with_file_name(name)
}

/// Readers never see a partially written file.
pub async fn write_file_atomically(
    io: &impl StorageIo,
    path: &Path,
    data: &[u8],
) -> io::Result<()> {
    let tmp_path = tmp_path(io, path);
    trace!(
        "writing \"{}\" through tmp file \"{}\"",
        path.display(),
        tmp_path.display(),
    );
    io.write_file(&tmp_path, data).await?;
    if let Err(e) = io.rename_file(&tmp_path, path).await {
        error!(
            "failed to rename tmp file \"{}\" to \"{}\": {e}",
            tmp_path.display(),
            path.display(),
        );
        if let Err(e) = io.remove_file(&tmp_path).await {
            error!(
                "failed to remove tmp file \"{}\": {e}",
                tmp_path.display(),
            );
        }
        return Err(e)
    }
    Ok(())
}
