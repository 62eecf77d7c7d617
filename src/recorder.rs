//! Writes every rendered frame to disk as a numbered PNG.
//!
//! Files are named `frame-00000000.png`, `frame-00000001.png`, ... so they
//! can be stitched into a video afterwards.

use std::path::{Path, PathBuf};

use crate::error::RecordError;

/// A rendered frame as tightly packed RGBA8 rows, top row first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

pub struct Recorder {
    dir: PathBuf,
    counter: u64,
}

impl Recorder {
    /// Record into `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, RecordError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        log::info!("recording frames to {}", dir.display());
        Ok(Self { dir, counter: 0 })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of frames written so far.
    pub fn frames(&self) -> u64 {
        self.counter
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame-{:08}.png", index))
    }

    /// Encode `frame` as the next PNG in the sequence.
    pub fn record(&mut self, frame: &Frame) -> Result<PathBuf, RecordError> {
        let expected = frame.width as usize * frame.height as usize * 4;
        if frame.rgba.len() != expected {
            return Err(RecordError::FrameSize {
                expected,
                actual: frame.rgba.len(),
            });
        }

        let path = self.frame_path(self.counter);
        image::save_buffer(
            &path,
            &frame.rgba,
            frame.width,
            frame.height,
            image::ExtendedColorType::Rgba8,
        )?;
        self.counter += 1;
        log::trace!("wrote {}", path.display());
        Ok(path)
    }
}
