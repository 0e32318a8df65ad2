use crate::events::EventBuffer;
use crate::midi::{self, MidiMessage};
use crate::pattern::{Pattern, MAX_PITCH_OFFSET, VISIBLE_ROWS};

// ── Device protocol constants ─────────────────────────────────────────────────
// Launchpad Mini Mk3, Programmer mode.  These byte sequences are part of the
// device's wire protocol and must not change.

pub const ENTER_PROGRAMMER_MODE: [u8; 9] =
    [0xF0, 0x00, 0x20, 0x29, 0x02, 0x0D, 0x0E, 0x01, 0xF7];
pub const EXIT_PROGRAMMER_MODE: [u8; 9] =
    [0xF0, 0x00, 0x20, 0x29, 0x02, 0x0D, 0x0E, 0x00, 0xF7];
/// Universal device inquiry — the device answers with its identity.
pub const DEVICE_INQUIRY: [u8; 6] = [0xF0, 0x7E, 0x7F, 0x06, 0x01, 0xF7];

/// Top-row control buttons used for navigation.
pub const CC_PITCH_DOWN: u8 = 91;
pub const CC_PITCH_UP:   u8 = 92;
pub const CC_PAGE_FIRST: u8 = 93;
pub const CC_PAGE_SECOND: u8 = 94;

const PAD_NOTE_BASE: u8 = 11;
const PAD_NOTE_LAST: u8 = 88;
const PAD_ROW_STRIDE: u8 = 10;

/// Entries from the device's fixed color palette.  The velocity byte of a
/// pad Note On selects one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PadColor {
    Off      = 0,
    White    = 3,
    Red      = 5,
    Yellow   = 13,
    Green    = 21,
    DimGreen = 23,
}

impl PadColor {
    #[inline]
    pub fn index(self) -> u8 {
        self as u8
    }
}

/// Note number of pad `(x, y)` in programmer mode: the grid is 11–88 with a
/// stride of 10 per row (numbers ending in 9 and 0 are the side buttons).
#[inline]
pub fn pad_note(x: u8, y: u8) -> u8 {
    PAD_NOTE_BASE + x + PAD_ROW_STRIDE * y
}

/// Inverse of `pad_note`.  `None` for anything outside the 8×8 grid.
pub fn note_pad(note: u8) -> Option<(u8, u8)> {
    if !(PAD_NOTE_BASE..=PAD_NOTE_LAST).contains(&note) {
        return None;
    }
    let offset = note - PAD_NOTE_BASE;
    let x = offset % PAD_ROW_STRIDE;
    let y = offset / PAD_ROW_STRIDE;
    if x >= VISIBLE_ROWS as u8 || y >= VISIBLE_ROWS as u8 {
        return None;
    }
    Some((x, y))
}

// ── Bridge ────────────────────────────────────────────────────────────────────

/// Keeps an 8×8 pad controller mirrored to pattern state.
///
/// Input side: pad presses toggle the cell under the pad, the top-row CCs
/// move the pitch window and flip the hardware page.  Output side: a full
/// LED repaint whenever something it shows has changed — pattern edits set
/// the dirty flag, playhead movement is detected against the step of the
/// last repaint.
///
/// The device only obeys LED messages in programmer mode, so the bridge
/// emits the mode-enter sysex before its first repaint.  The sysex goes to
/// both the primary and the dedicated hardware output because which port
/// actually reaches the device is the host's routing decision.
pub struct LaunchpadBridge {
    mode_entered:      bool,
    exit_requested:    bool,
    inquiry_requested: bool,
    leds_dirty:        bool,
    last_led_step:     Option<u8>,
}

impl LaunchpadBridge {
    pub fn new() -> Self {
        Self {
            mode_entered:      false,
            exit_requested:    false,
            inquiry_requested: false,
            leds_dirty:        true,
            last_led_step:     None,
        }
    }

    /// Back to the power-on protocol state; the next tick re-enters
    /// programmer mode and repaints.  Called on activate.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub fn mode_entered(&self) -> bool {
        self.mode_entered
    }

    #[inline]
    pub fn mark_dirty(&mut self) {
        self.leds_dirty = true;
    }

    /// Editor asked for a controller reset: leave programmer mode now,
    /// re-enter on the following tick.
    pub fn request_reset(&mut self) {
        self.exit_requested = true;
        self.leds_dirty = true;
    }

    /// Editor asked for a device inquiry broadcast.
    pub fn request_inquiry(&mut self) {
        self.inquiry_requested = true;
    }

    // ── Input ─────────────────────────────────────────────────────────────

    /// Decode one incoming message from the device.  Returns whether pattern
    /// state changed.  Anything that is not a pad press or a known top-row
    /// CC is ignored — releases, aftertouch, inquiry replies.
    pub fn handle_message(&mut self, msg: &MidiMessage, pattern: &mut Pattern) -> bool {
        match *msg {
            MidiMessage::NoteOn { note, velocity, .. } if velocity > 0 => {
                self.handle_pad(note, pattern)
            }
            MidiMessage::ControlChange { controller, value, .. } if value > 0 => {
                self.handle_control(controller, pattern)
            }
            _ => false,
        }
    }

    fn handle_pad(&mut self, note: u8, pattern: &mut Pattern) -> bool {
        let Some((x, y)) = note_pad(note) else {
            return false;
        };
        let step = x + VISIBLE_ROWS as u8 * pattern.hardware_page();
        let pitch = pattern.pitch_offset() + y;
        if step >= pattern.sequence_length() {
            return false;
        }
        if pattern.toggle(step, pitch) {
            self.leds_dirty = true;
            return true;
        }
        false
    }

    fn handle_control(&mut self, controller: u8, pattern: &mut Pattern) -> bool {
        let changed = match controller {
            CC_PITCH_DOWN => {
                let offset = pattern.pitch_offset();
                if offset > 0 {
                    pattern.set_pitch_offset(offset - 1);
                    true
                } else {
                    false
                }
            }
            CC_PITCH_UP => {
                let offset = pattern.pitch_offset();
                if offset < MAX_PITCH_OFFSET {
                    pattern.set_pitch_offset(offset + 1);
                    true
                } else {
                    false
                }
            }
            CC_PAGE_FIRST => pattern.set_hardware_page(0),
            CC_PAGE_SECOND => pattern.set_hardware_page(1),
            _ => false,
        };
        if changed {
            self.leds_dirty = true;
        }
        changed
    }

    // ── Output ────────────────────────────────────────────────────────────

    /// Mode housekeeping at the top of a tick: a pending exit goes out
    /// first (the re-enter then happens next tick), otherwise the enter
    /// sysex if the device has not been claimed yet.  Both are dual-routed.
    pub fn run_mode_cycle(&mut self, midi_out: &mut EventBuffer, device_out: &mut EventBuffer) {
        if self.exit_requested {
            midi_out.push(0, &EXIT_PROGRAMMER_MODE);
            device_out.push(0, &EXIT_PROGRAMMER_MODE);
            self.mode_entered = false;
            self.exit_requested = false;
        } else if !self.mode_entered {
            midi_out.push(0, &ENTER_PROGRAMMER_MODE);
            device_out.push(0, &ENTER_PROGRAMMER_MODE);
            self.mode_entered = true;
        }

        if self.inquiry_requested {
            midi_out.push(0, &DEVICE_INQUIRY);
            device_out.push(0, &DEVICE_INQUIRY);
            self.inquiry_requested = false;
        }
    }

    /// A repaint is due when state changed or the playhead moved pads.
    pub fn needs_refresh(&self, current_step: u8) -> bool {
        self.leds_dirty || self.last_led_step != Some(current_step)
    }

    /// Repaint all 64 pads plus the four navigation LEDs.
    ///
    /// Color rules per pad: columns past the sequence end are dark; on the
    /// playhead column an active cell is yellow and an empty one dim green;
    /// elsewhere active is green, empty is off.
    pub fn refresh_leds(
        &mut self,
        pattern: &Pattern,
        current_step: u8,
        device_out: &mut EventBuffer,
    ) {
        let rows = VISIBLE_ROWS as u8;
        for y in 0..rows {
            let pitch = pattern.pitch_offset() + y;
            for x in 0..rows {
                let step = x + rows * pattern.hardware_page();
                let color = if step >= pattern.sequence_length() {
                    PadColor::Off
                } else if step == current_step {
                    if pattern.is_set(step, pitch) {
                        PadColor::Yellow
                    } else {
                        PadColor::DimGreen
                    }
                } else if pattern.is_set(step, pitch) {
                    PadColor::Green
                } else {
                    PadColor::Off
                };
                device_out.push(0, &midi::note_on(0, pad_note(x, y), color.index()));
            }
        }

        let lit = |on: bool| if on { PadColor::White } else { PadColor::Off };
        let nav = [
            (CC_PITCH_DOWN, lit(pattern.pitch_offset() > 0)),
            (CC_PITCH_UP, lit(pattern.pitch_offset() < MAX_PITCH_OFFSET)),
            (CC_PAGE_FIRST, lit(pattern.hardware_page() > 0)),
            (
                CC_PAGE_SECOND,
                lit(pattern.sequence_length() > rows && pattern.hardware_page() == 0),
            ),
        ];
        for (cc, color) in nav {
            device_out.push(0, &midi::control_change(0, cc, color.index()));
        }

        self.leds_dirty = false;
        self.last_led_step = Some(current_step);
    }
}

impl Default for LaunchpadBridge {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn find_pad<'a>(
        out: &'a EventBuffer,
        x: u8,
        y: u8,
    ) -> Option<&'a crate::events::MidiEvent> {
        out.iter()
            .find(|ev| ev.bytes().len() == 3 && ev.bytes()[0] == 0x90 && ev.bytes()[1] == pad_note(x, y))
    }

    #[test]
    fn pad_note_mapping_roundtrips() {
        assert_eq!(pad_note(0, 0), 11);
        assert_eq!(pad_note(7, 7), 88);
        assert_eq!(note_pad(45), Some((4, 3)));
        assert_eq!(note_pad(10), None);
        assert_eq!(note_pad(89), None);
        // Side-column buttons (x = 8 or 9 after decoding) are not pads.
        assert_eq!(note_pad(19), None);
        assert_eq!(note_pad(20), None);
    }

    #[test]
    fn pad_press_toggles_the_cell_under_it() {
        let mut bridge = LaunchpadBridge::new();
        let mut pattern = Pattern::new();
        let msg = MidiMessage::NoteOn { channel: 0, note: 45, velocity: 127 };
        assert!(bridge.handle_message(&msg, &mut pattern));
        assert!(pattern.is_set(4, 36 + 3));
    }

    #[test]
    fn pad_release_is_ignored() {
        let mut bridge = LaunchpadBridge::new();
        let mut pattern = Pattern::new();
        let press = MidiMessage::NoteOn { channel: 0, note: 45, velocity: 0 };
        assert!(!bridge.handle_message(&press, &mut pattern));
        let off = MidiMessage::NoteOff { channel: 0, note: 45, velocity: 0 };
        assert!(!bridge.handle_message(&off, &mut pattern));
        assert!(!pattern.is_set(4, 39));
    }

    #[test]
    fn pad_past_sequence_end_is_inert() {
        let mut bridge = LaunchpadBridge::new();
        let mut pattern = Pattern::new();
        pattern.set_sequence_length(4);
        // Pad column 5, bottom row.
        let msg = MidiMessage::NoteOn { channel: 0, note: pad_note(5, 0), velocity: 100 };
        assert!(!bridge.handle_message(&msg, &mut pattern));
        assert!(!pattern.is_set(5, 36));
    }

    #[test]
    fn page_two_maps_pads_onto_the_upper_columns() {
        let mut bridge = LaunchpadBridge::new();
        let mut pattern = Pattern::new();
        pattern.set_sequence_length(16);
        pattern.set_hardware_page(1);
        let msg = MidiMessage::NoteOn { channel: 0, note: pad_note(1, 2), velocity: 100 };
        assert!(bridge.handle_message(&msg, &mut pattern));
        assert!(pattern.is_set(9, 36 + 2));
    }

    #[test]
    fn nav_ccs_move_the_window_within_bounds() {
        let mut bridge = LaunchpadBridge::new();
        let mut pattern = Pattern::new();

        let up = MidiMessage::ControlChange { channel: 0, controller: CC_PITCH_UP, value: 127 };
        assert!(bridge.handle_message(&up, &mut pattern));
        assert_eq!(pattern.pitch_offset(), 37);

        let down = MidiMessage::ControlChange { channel: 0, controller: CC_PITCH_DOWN, value: 127 };
        assert!(bridge.handle_message(&down, &mut pattern));
        assert_eq!(pattern.pitch_offset(), 36);

        pattern.set_pitch_offset(0);
        assert!(!bridge.handle_message(&down, &mut pattern), "window is already at the bottom");

        pattern.set_pitch_offset(MAX_PITCH_OFFSET);
        assert!(!bridge.handle_message(&up, &mut pattern), "window is already at the top");
    }

    #[test]
    fn page_cc_respects_sequence_length() {
        let mut bridge = LaunchpadBridge::new();
        let mut pattern = Pattern::new();
        let second = MidiMessage::ControlChange { channel: 0, controller: CC_PAGE_SECOND, value: 1 };
        assert!(!bridge.handle_message(&second, &mut pattern));
        pattern.set_sequence_length(12);
        assert!(bridge.handle_message(&second, &mut pattern));
        assert_eq!(pattern.hardware_page(), 1);

        let first = MidiMessage::ControlChange { channel: 0, controller: CC_PAGE_FIRST, value: 1 };
        assert!(bridge.handle_message(&first, &mut pattern));
        assert_eq!(pattern.hardware_page(), 0);
    }

    #[test]
    fn mode_is_entered_once_and_dual_routed() {
        let mut bridge = LaunchpadBridge::new();
        let mut midi_out = EventBuffer::with_capacity(8);
        let mut device_out = EventBuffer::with_capacity(8);

        bridge.run_mode_cycle(&mut midi_out, &mut device_out);
        assert_eq!(midi_out.as_slice()[0].bytes(), &ENTER_PROGRAMMER_MODE);
        assert_eq!(device_out.as_slice()[0].bytes(), &ENTER_PROGRAMMER_MODE);
        assert!(bridge.mode_entered());

        midi_out.clear();
        device_out.clear();
        bridge.run_mode_cycle(&mut midi_out, &mut device_out);
        assert!(midi_out.is_empty(), "mode must only be entered once");
    }

    #[test]
    fn reset_exits_then_reenters_next_cycle() {
        let mut bridge = LaunchpadBridge::new();
        let mut midi_out = EventBuffer::with_capacity(8);
        let mut device_out = EventBuffer::with_capacity(8);

        bridge.run_mode_cycle(&mut midi_out, &mut device_out);
        bridge.request_reset();

        midi_out.clear();
        device_out.clear();
        bridge.run_mode_cycle(&mut midi_out, &mut device_out);
        assert_eq!(device_out.as_slice()[0].bytes(), &EXIT_PROGRAMMER_MODE);
        assert!(!bridge.mode_entered());

        midi_out.clear();
        device_out.clear();
        bridge.run_mode_cycle(&mut midi_out, &mut device_out);
        assert_eq!(device_out.as_slice()[0].bytes(), &ENTER_PROGRAMMER_MODE);
        assert!(bridge.mode_entered());
    }

    #[test]
    fn refresh_paints_64_pads_and_4_nav_leds() {
        let mut bridge = LaunchpadBridge::new();
        let mut pattern = Pattern::new();
        let mut out = EventBuffer::with_capacity(128);
        pattern.toggle(4, 36 + 3);

        bridge.refresh_leds(&pattern, 0, &mut out);
        assert_eq!(out.len(), 68);

        // The toggled cell away from the playhead is green.
        assert_eq!(find_pad(&out, 4, 3).unwrap().bytes()[2], PadColor::Green.index());
        // Playhead column, empty cell: dim green.
        assert_eq!(find_pad(&out, 0, 0).unwrap().bytes()[2], PadColor::DimGreen.index());
        // Elsewhere: off.
        assert_eq!(find_pad(&out, 5, 5).unwrap().bytes()[2], PadColor::Off.index());
    }

    #[test]
    fn refresh_highlights_the_playhead_cell_in_yellow() {
        let mut bridge = LaunchpadBridge::new();
        let mut pattern = Pattern::new();
        let mut out = EventBuffer::with_capacity(128);
        pattern.toggle(2, 36);

        bridge.refresh_leds(&pattern, 2, &mut out);
        assert_eq!(find_pad(&out, 2, 0).unwrap().bytes()[2], PadColor::Yellow.index());
    }

    #[test]
    fn refresh_darkens_columns_past_the_sequence_end() {
        let mut bridge = LaunchpadBridge::new();
        let mut pattern = Pattern::new();
        let mut out = EventBuffer::with_capacity(128);
        pattern.set_sequence_length(6);
        pattern.toggle(7, 36); // stored but outside the playing range

        bridge.refresh_leds(&pattern, 0, &mut out);
        assert_eq!(find_pad(&out, 7, 0).unwrap().bytes()[2], PadColor::Off.index());
    }

    #[test]
    fn nav_leds_reflect_reachability() {
        let mut bridge = LaunchpadBridge::new();
        let mut pattern = Pattern::new();
        let mut out = EventBuffer::with_capacity(128);
        pattern.set_pitch_offset(0);
        pattern.set_sequence_length(16);

        bridge.refresh_leds(&pattern, 0, &mut out);
        let cc = |n: u8| {
            out.iter()
                .find(|ev| ev.bytes()[0] == 0xB0 && ev.bytes()[1] == n)
                .unwrap()
                .bytes()[2]
        };
        assert_eq!(cc(CC_PITCH_DOWN), PadColor::Off.index(), "already at the bottom");
        assert_eq!(cc(CC_PITCH_UP), PadColor::White.index());
        assert_eq!(cc(CC_PAGE_FIRST), PadColor::Off.index(), "already on page 0");
        assert_eq!(cc(CC_PAGE_SECOND), PadColor::White.index(), "16 steps reach page 1");
    }

    #[test]
    fn refresh_tracks_playhead_movement() {
        let mut bridge = LaunchpadBridge::new();
        let mut pattern = Pattern::new();
        let mut out = EventBuffer::with_capacity(128);

        assert!(bridge.needs_refresh(0), "fresh bridge must paint");
        bridge.refresh_leds(&pattern, 0, &mut out);
        assert!(!bridge.needs_refresh(0));
        assert!(bridge.needs_refresh(1), "playhead moved");
        bridge.mark_dirty();
        assert!(bridge.needs_refresh(0));
    }
}
