//! Persistence stage: writes retained segments to the record directory.
//!

pub mod storage;

use self::storage::Storage;
use crate::module::define;
use crate::module::error::Result;
use crate::module::frame::VideoSegment;
use crate::module::stage::Stage;

pub struct PersistenceStage {
    storage: Storage,
}

impl PersistenceStage {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

impl Stage for PersistenceStage {
    type Input = VideoSegment;

    fn name(&self) -> &'static str {
        define::stage::PERSISTENCE
    }

    fn handle(&mut self, segment: VideoSegment) -> Result<()> {
        let path = self.storage.write_segment(&segment, chrono::Local::now())?;
        log::info!(
            target: self.name(),
            "Saved {} ({} bytes, stills {}..={}, {:.1}s recorded {} - {})",
            path.display(),
            segment.bytes.len(),
            segment.first_still,
            segment.last_still,
            segment.recorded_seconds,
            segment.started_at.format("%H:%M:%S"),
            segment.completed_at.format("%H:%M:%S")
        );
        Ok(())
    }

    /// Last stage of its branch.
    fn close_outputs(&mut self) {}
}
