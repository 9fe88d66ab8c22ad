//! Artifact Storage
//!
//! Every artifact is named after the second it is written in. A second
//! artifact in the same second gets a `_1`, `_2`, ... suffix instead of
//! overwriting the first.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use image::codecs::jpeg::JpegEncoder;
use image::GrayImage;

use crate::module::define;
use crate::module::error::{NightwatchError, Result};
use crate::module::frame::VideoSegment;

const EVIDENCE_QUALITY: u8 = 90;

/// Writer for the record directory. Cheap to clone.
///
#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `MMDD_HHMMSS`
    pub fn stamp(at: DateTime<Local>) -> String {
        at.format(define::naming::TIME_FORMAT).to_string()
    }

    /// Write a retained segment as `MMDD_HHMMSS.<container>`.
    pub fn write_segment(&self, segment: &VideoSegment, at: DateTime<Local>) -> Result<PathBuf> {
        self.write_unique(&Self::stamp(at), segment.container, &segment.bytes)
    }

    /// Write an evidence crop as `detMMDD_HHMMSS.jpg`.
    pub fn write_evidence(&self, crop: &GrayImage, at: DateTime<Local>) -> Result<PathBuf> {
        let mut jpeg: Vec<u8> = vec![];
        JpegEncoder::new_with_quality(&mut jpeg, EVIDENCE_QUALITY).encode_image(crop)?;
        let stem = format!("{}{}", define::naming::EVIDENCE_PREFIX, Self::stamp(at));
        self.write_unique(&stem, define::naming::EVIDENCE_EXT, &jpeg)
    }

    fn write_unique(&self, stem: &str, ext: &str, bytes: &[u8]) -> Result<PathBuf> {
        let mut n = 0u32;
        loop {
            let name = match n {
                0 => format!("{}.{}", stem, ext),
                _ => format!("{}_{}.{}", stem, n, ext),
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(bytes)
                        .map_err(|e| NightwatchError::storage(&path, e))?;
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(NightwatchError::storage(&path, e)),
            }
        }
    }
}
