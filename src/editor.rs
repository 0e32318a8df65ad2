use crate::pattern::{Pattern, MAX_STEPS, VISIBLE_ROWS};

// Sentinel values the editor writes onto the coordinate channel to trigger
// discrete actions.  The channel has no event semantics of its own, so each
// action fires on a value transition.  Other negative values are reserved.
const SENTINEL_RESET_CONTROLLER: i32 = -100;
const SENTINEL_DEVICE_INQUIRY:   i32 = -200;
const SENTINEL_CLEAR_ALL:        i32 = -300;
const SENTINEL_RECENTER_PITCH:   i32 = -400;

// ── Channel values ────────────────────────────────────────────────────────────

/// Scalar input channels, persistent across ticks.  The host delivers the
/// latest value of each before the tick; the sync layer edge-detects them.
#[derive(Clone, Copy, Debug)]
pub struct ControlsIn {
    /// Step coordinate of an editor toggle, or a sentinel.
    pub grid_x: f32,
    /// Row-within-viewport coordinate of an editor toggle.
    pub grid_y: f32,
    pub sequence_length: f32,
    /// ≥ 0.5 suppresses mid-step Note Offs.
    pub midi_filter: f32,
}

impl Default for ControlsIn {
    fn default() -> Self {
        Self {
            grid_x: -1.0,
            grid_y: -1.0,
            sequence_length: crate::pattern::DEFAULT_SEQUENCE_LENGTH as f32,
            midi_filter: 0.0,
        }
    }
}

/// Scalar output channels the editor observes.
#[derive(Clone, Copy, Debug, Default)]
pub struct ControlsOut {
    pub current_step:    f32,
    pub sequence_length: f32,
    pub pitch_offset:    f32,
    /// Rolling change counter (mod 10⁶).
    pub grid_changed:    f32,
    /// `rows[x]` bit-packs the visible 8-row slice of column `x`.
    pub rows: [f32; MAX_STEPS],
}

// ── Edits ─────────────────────────────────────────────────────────────────────

/// One decoded editor action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorCommand {
    /// Toggle the cell at `(step, pitch_offset + row)`.
    ToggleCell { step: u8, row: u8 },
    /// Drop the hardware out of programmer mode and re-enter next tick.
    ResetController,
    /// Broadcast a universal device inquiry on both outputs.
    DeviceInquiry,
    /// Wipe every cell.
    ClearAll,
    /// Put the pitch window back at its default position.
    RecenterPitch,
}

/// Edge detection over the editor's persistent channels.
///
/// The coordinate pair and the length channel keep their last value between
/// writes, so an edit is "the value is different from what we saw last
/// tick".  This makes each sentinel idempotent per transition: holding
/// −300 on the channel clears the grid once, not every tick.
pub struct EditorSync {
    prev_grid_x: f32,
    prev_grid_y: f32,
    prev_length: f32,
}

impl EditorSync {
    pub fn new() -> Self {
        let defaults = ControlsIn::default();
        Self {
            prev_grid_x: defaults.grid_x,
            prev_grid_y: defaults.grid_y,
            prev_length: defaults.sequence_length,
        }
    }

    /// Decode the coordinate channel pair.  `None` when the value pair did
    /// not move, is a reserved sentinel, or is out of range.
    pub fn decode_coords(&mut self, grid_x: f32, grid_y: f32) -> Option<EditorCommand> {
        if grid_x == self.prev_grid_x && grid_y == self.prev_grid_y {
            return None;
        }
        self.prev_grid_x = grid_x;
        self.prev_grid_y = grid_y;

        if grid_x < 0.0 {
            return match grid_x as i32 {
                SENTINEL_RESET_CONTROLLER => Some(EditorCommand::ResetController),
                SENTINEL_DEVICE_INQUIRY => Some(EditorCommand::DeviceInquiry),
                SENTINEL_CLEAR_ALL => Some(EditorCommand::ClearAll),
                SENTINEL_RECENTER_PITCH => Some(EditorCommand::RecenterPitch),
                _ => None,
            };
        }

        let step = grid_x as i32;
        let row = grid_y as i32;
        if step < MAX_STEPS as i32 && (0..VISIBLE_ROWS as i32).contains(&row) {
            Some(EditorCommand::ToggleCell { step: step as u8, row: row as u8 })
        } else {
            None
        }
    }

    /// Decode the length channel.  `Some(clamped)` only on a fresh write.
    pub fn decode_length(&mut self, value: f32) -> Option<u8> {
        if value == self.prev_length {
            return None;
        }
        self.prev_length = value;
        Some(value.round().clamp(1.0, MAX_STEPS as f32) as u8)
    }
}

impl Default for EditorSync {
    fn default() -> Self {
        Self::new()
    }
}

/// Write every observable output from current state.
pub fn publish(pattern: &Pattern, current_step: u8, out: &mut ControlsOut) {
    out.current_step = f32::from(current_step);
    out.sequence_length = f32::from(pattern.sequence_length());
    out.pitch_offset = f32::from(pattern.pitch_offset());
    out.grid_changed = pattern.revision() as f32;
    for (step, row) in out.rows.iter_mut().enumerate() {
        *row = f32::from(pattern.pack_visible_row(step as u8));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
