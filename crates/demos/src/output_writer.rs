//! A file-backed sink mirroring `cpp/samples/output_writer_interface.h`'s
//! `OutputWriterInterface`/`OutputWriterProvider` pair: an abstract "write
//! bytes somewhere" surface plus a factory keyed by a file name, so the
//! bookkeeping and media-writing code never open files directly.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Something bytes can be appended to and eventually closed.
pub trait OutputWriter: Send {
    fn write(&mut self, content: &[u8]) -> anyhow::Result<()>;
    fn close(&mut self) -> anyhow::Result<()>;
}

/// Appends to a file under a fixed output directory, created on first write.
pub struct FileOutputWriter {
    path: PathBuf,
    file: Option<File>,
}

impl FileOutputWriter {
    pub fn new(path: PathBuf) -> Self {
        FileOutputWriter { path, file: None }
    }

    fn file(&mut self) -> anyhow::Result<&mut File> {
        if self.file.is_none() {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            self.file = Some(
                std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)?,
            );
        }
        Ok(self.file.as_mut().expect("just initialized"))
    }
}

impl OutputWriter for FileOutputWriter {
    fn write(&mut self, content: &[u8]) -> anyhow::Result<()> {
        self.file()?.write_all(content)?;
        Ok(())
    }

    fn close(&mut self) -> anyhow::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        Ok(())
    }
}

impl Drop for FileOutputWriter {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Builds a [`FileOutputWriter`] rooted at `output_dir`, named by the
/// identifier the caller supplies (e.g. `ResourceManager::output_file_identifier`).
pub fn file_writer_provider(output_dir: PathBuf) -> impl Fn(&str) -> FileOutputWriter {
    move |file_name: &str| FileOutputWriter::new(output_dir.join(file_name))
}

/// Serializes a PCM16 buffer as little-endian interleaved samples, matching
/// `WritePcm16` in `cpp/samples/media_writing.cc`.
pub fn write_pcm16(samples: &[i16], writer: &mut dyn OutputWriter) -> anyhow::Result<()> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    writer.write(&bytes)
}

/// Serializes a YUV420 buffer (I420 plane order: Y, then U, then V), matching
/// `WriteYuv420` in `cpp/samples/media_writing.cc`. `data` is expected to
/// already be in I420 plane order with no row padding.
pub fn write_yuv420(data: &[u8], writer: &mut dyn OutputWriter) -> anyhow::Result<()> {
    writer.write(data)
}

pub fn ensure_output_dir(dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_pcm16_is_little_endian_interleaved() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = FileOutputWriter::new(dir.path().join("out.pcm"));
        write_pcm16(&[1, -1], &mut writer).unwrap();
        writer.close().unwrap();
        let bytes = std::fs::read(dir.path().join("out.pcm")).unwrap();
        assert_eq!(bytes, vec![1, 0, 0xFF, 0xFF]);
    }

    #[test]
    fn write_yuv420_appends_raw_planes() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = FileOutputWriter::new(dir.path().join("out.yuv"));
        write_yuv420(&[1, 2, 3, 4], &mut writer).unwrap();
        write_yuv420(&[5, 6], &mut writer).unwrap();
        writer.close().unwrap();
        let bytes = std::fs::read(dir.path().join("out.yuv")).unwrap();
        assert_eq!(bytes, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn provider_joins_file_name_to_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let provider = file_writer_provider(dir.path().to_path_buf());
        let mut writer = provider("alice_abc_1");
        writer.write(b"hello").unwrap();
        writer.close().unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("alice_abc_1")).unwrap(),
            "hello"
        );
    }
}
