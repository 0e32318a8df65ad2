use crate::events::EventBuffer;
use crate::midi;
use crate::pattern::Pattern;

/// Velocity for every emitted Note On.  Per-step velocity is out of scope.
pub const NOTE_VELOCITY: u8 = 100;
/// All sequencer output goes to MIDI channel 0.
pub const MIDI_CHANNEL: u8 = 0;

// ── Note set ──────────────────────────────────────────────────────────────────

/// A set of MIDI pitches as a 128-bit mask.  Insert, remove and iterate are
/// all mask arithmetic — this is the only bookkeeping allowed on the tick
/// path for tracking which notes are sounding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoteSet(u128);

impl NoteSet {
    pub const EMPTY: NoteSet = NoteSet(0);

    #[inline]
    pub fn insert(&mut self, pitch: u8) {
        self.0 |= 1u128 << (pitch & 0x7F);
    }

    #[inline]
    pub fn contains(&self, pitch: u8) -> bool {
        self.0 & (1u128 << (pitch & 0x7F)) != 0
    }

    #[inline]
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    #[inline]
    pub fn union_with(&mut self, other: NoteSet) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.0.count_ones()
    }

    /// Ascending pitch order.
    pub fn iter(&self) -> NoteSetIter {
        NoteSetIter(self.0)
    }

    pub(crate) fn from_bits(bits: u128) -> Self {
        NoteSet(bits)
    }
}

pub struct NoteSetIter(u128);

impl Iterator for NoteSetIter {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.0 == 0 {
            return None;
        }
        let pitch = self.0.trailing_zeros() as u8;
        self.0 &= self.0 - 1;
        Some(pitch)
    }
}

// ── Sequencer core ────────────────────────────────────────────────────────────

/// Emits Note On at step starts and Note Off at mid-step, and owns the set of
/// currently-sounding pitches.
///
/// Notes held when the transport stops (or the plugin is re-activated or
/// deactivated) are moved to a pending set and their Note Offs go out at
/// offset 0 of the following tick — the all-notes-off guarantee.  The
/// note-off filter suppresses only the mid-step releases, for downstream
/// instruments that gate themselves; the stop-edge releases always fire.
pub struct Sequencer {
    active:          NoteSet,
    pending_off:     NoteSet,
    first_run:       bool,
    note_off_filter: bool,
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            active:          NoteSet::EMPTY,
            pending_off:     NoteSet::EMPTY,
            first_run:       false,
            note_off_filter: false,
        }
    }

    #[inline]
    pub fn active(&self) -> NoteSet {
        self.active
    }

    pub fn set_note_off_filter(&mut self, on: bool) {
        self.note_off_filter = on;
    }

    #[inline]
    pub fn note_off_filter(&self) -> bool {
        self.note_off_filter
    }

    /// Arm the first-tick rule: the next tick plays step 0 at offset 0
    /// without waiting for a boundary.
    pub fn arm_first_run(&mut self) {
        self.first_run = true;
    }

    pub fn take_first_run(&mut self) -> bool {
        let armed = self.first_run;
        self.first_run = false;
        armed
    }

    /// Stop edge: whatever is sounding now gets its Note Off at offset 0 of
    /// the next tick.
    pub fn hold_notes_for_release(&mut self) {
        self.pending_off.union_with(self.active);
        self.active.clear();
    }

    /// Emit the Note Offs queued by a stop/activate/deactivate edge.
    pub fn flush_pending(&mut self, out: &mut EventBuffer) {
        for pitch in self.pending_off.iter() {
            out.push(0, &midi::note_off(MIDI_CHANNEL, pitch, 0));
        }
        self.pending_off.clear();
    }

    /// Step start: Note On for every active cell in the column.
    pub fn play_step(&mut self, pattern: &Pattern, step: u8, offset: u32, out: &mut EventBuffer) {
        for pitch in NoteSet::from_bits(pattern.column(step)).iter() {
            out.push(offset, &midi::note_on(MIDI_CHANNEL, pitch, NOTE_VELOCITY));
            self.active.insert(pitch);
        }
    }

    /// Mid-step: Note Off for everything sounding, unless filtered.
    pub fn release_step(&mut self, offset: u32, out: &mut EventBuffer) {
        if self.note_off_filter {
            return;
        }
        for pitch in self.active.iter() {
            out.push(offset, &midi::note_off(MIDI_CHANNEL, pitch, 0));
        }
        self.active.clear();
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
