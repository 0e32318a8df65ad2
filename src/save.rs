use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::pattern::{
    Pattern, MAX_PITCH_OFFSET, MAX_SEQUENCE_LENGTH, MAX_STEPS, MIN_SEQUENCE_LENGTH, VISIBLE_ROWS,
};

const COLUMN_BYTES: usize = 16;

/// The pattern blob the host reads and writes for persistence.  Playback
/// state (playhead, held notes, hardware mode) deliberately has no place
/// here — restoring a pattern must never move the transport.
#[derive(Serialize, Deserialize)]
pub struct PatternSnapshot {
    /// 16 columns × 16 little-endian bytes, one bit per pitch.
    pub grid: Vec<u8>,
    pub sequence_length: u8,
    pub pitch_offset:    u8,
    pub hardware_page:   u8,
}

impl Pattern {
    pub fn snapshot(&self) -> PatternSnapshot {
        let mut grid = Vec::with_capacity(MAX_STEPS * COLUMN_BYTES);
        for column in &self.columns {
            grid.extend_from_slice(&column.to_le_bytes());
        }
        PatternSnapshot {
            grid,
            sequence_length: self.sequence_length,
            pitch_offset:    self.pitch_offset,
            hardware_page:   self.hardware_page,
        }
    }

    /// Load a snapshot, clamping every field exactly like the live setters
    /// would.  Blobs shorter than a full grid fill what they cover; extra
    /// bytes are ignored.
    pub fn restore(&mut self, snapshot: &PatternSnapshot) {
        self.columns = [0; MAX_STEPS];
        for (index, chunk) in snapshot.grid.chunks(COLUMN_BYTES).take(MAX_STEPS).enumerate() {
            let mut bytes = [0u8; COLUMN_BYTES];
            bytes[..chunk.len()].copy_from_slice(chunk);
            self.columns[index] = u128::from_le_bytes(bytes);
        }

        self.sequence_length = snapshot
            .sequence_length
            .clamp(MIN_SEQUENCE_LENGTH, MAX_SEQUENCE_LENGTH);
        self.pitch_offset = snapshot.pitch_offset.min(MAX_PITCH_OFFSET);
        self.hardware_page =
            if snapshot.hardware_page == 1 && self.sequence_length > VISIBLE_ROWS as u8 {
                1
            } else {
                0
            };
        self.bump_revision();
    }
}

/// Persist a pattern as pretty JSON.
pub fn write_file(path: impl AsRef<Path>, pattern: &Pattern) -> Result<()> {
    let json = serde_json::to_string_pretty(&pattern.snapshot())?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn read_file(path: impl AsRef<Path>) -> Result<PatternSnapshot> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
