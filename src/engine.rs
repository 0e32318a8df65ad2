use anyhow::{bail, Result};

use crate::clock::{Clock, CrossingKind};
use crate::editor::{self, ControlsIn, ControlsOut, EditorCommand, EditorSync};
use crate::events::{EventBuffer, HostEvent};
use crate::launchpad::LaunchpadBridge;
use crate::midi::MidiParser;
use crate::pattern::{Pattern, DEFAULT_PITCH_OFFSET, VIEWPORT_BYTES};
use crate::sequencer::Sequencer;
use crate::transport;

// Emission capacities.  The worst primary-stream tick is a full stop edge
// (128 offs) plus a fully stacked step start (128 ons) plus mode sysex; the
// hardware stream peaks at one repaint (64 pads + 4 nav) plus sysex.
pub const MIDI_OUT_CAPACITY:   usize = 512;
pub const DEVICE_OUT_CAPACITY: usize = 128;
pub const NOTIFY_OUT_CAPACITY: usize = 8;

// ── Outputs ───────────────────────────────────────────────────────────────────

/// The per-tick output surface.  The host allocates this once and loans it
/// to `tick`, which rebinds (clears) the buffers at the start of every call
/// — after `tick` returns the host reads and forwards the contents.
pub struct Outputs {
    /// Sequencer notes, plus one copy of each mode/inquiry sysex.
    pub midi: EventBuffer,
    /// LED updates and sysex for the pad hardware.
    pub device: EventBuffer,
    /// Viewport blobs for the editor, one per mutated tick.
    pub notify: EventBuffer,
    pub controls: ControlsOut,
}

impl Outputs {
    pub fn new() -> Self {
        Self {
            midi:     EventBuffer::with_capacity(MIDI_OUT_CAPACITY),
            device:   EventBuffer::with_capacity(DEVICE_OUT_CAPACITY),
            notify:   EventBuffer::with_capacity(NOTIFY_OUT_CAPACITY),
            controls: ControlsOut::default(),
        }
    }
}

impl Default for Outputs {
    fn default() -> Self {
        Self::new()
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// The whole sequencer behind one real-time entry point.
///
/// Owns pattern, clock, note tracking, the hardware bridge and the editor
/// sync state; `tick` runs them in a fixed order with no allocation, no
/// locking and no I/O beyond writing into the loaned output buffers.  The
/// host drives it from the audio thread; nothing else may touch it.
pub struct GridSeq {
    pattern:   Pattern,
    clock:     Clock,
    sequencer: Sequencer,
    bridge:    LaunchpadBridge,
    editor:    EditorSync,
    /// Pattern revision already announced to the editor.
    notified_revision: u32,
}

impl GridSeq {
    /// A non-positive sample rate is unrecoverable misconfiguration — refuse
    /// to instantiate, the way the original returns a null handle.
    pub fn new(sample_rate: f64) -> Result<Self> {
        if sample_rate <= 0.0 {
            bail!("sample rate must be positive, got {sample_rate}");
        }
        let pattern = Pattern::new();
        let notified_revision = pattern.revision();
        Ok(Self {
            pattern,
            clock: Clock::new(sample_rate),
            sequencer: Sequencer::new(),
            bridge: LaunchpadBridge::new(),
            editor: EditorSync::new(),
            notified_revision,
        })
    }

    /// Start playback from the top.  Pattern content survives; the playhead,
    /// note tracking and hardware mode state do not.  Any notes still held
    /// from before are released at offset 0 of the next tick.
    pub fn activate(&mut self) {
        self.sequencer.hold_notes_for_release();
        self.sequencer.arm_first_run();
        self.clock.start();
        self.bridge.reset();
    }

    /// Stop edge: the next tick (if the host sends one) emits the releases
    /// and nothing else.
    pub fn deactivate(&mut self) {
        self.clock.stop();
        self.sequencer.hold_notes_for_release();
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Direct pattern access for host-side setup and snapshot restore.
    /// Not for use while another thread is ticking — but no other thread
    /// should ever have this handle in the first place.
    pub fn pattern_mut(&mut self) -> &mut Pattern {
        &mut self.pattern
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn current_step(&self) -> u8 {
        self.clock.current_step(self.pattern.sequence_length())
    }

    // ── The real-time entry point ─────────────────────────────────────────

    pub fn tick(
        &mut self,
        n_samples: u32,
        events: &[HostEvent],
        controls: &ControlsIn,
        out: &mut Outputs,
    ) {
        // Bind the loaned buffers: start this tick's output sequences empty.
        out.midi.clear();
        out.device.clear();
        out.notify.clear();

        // 1. Persistent scalar inputs.
        if let Some(length) = self.editor.decode_length(controls.sequence_length) {
            self.pattern.set_sequence_length(length);
            self.bridge.mark_dirty();
        }
        self.sequencer.set_note_off_filter(controls.midi_filter >= 0.5);

        // 2. Input event stream: transport to the clock, MIDI to the bridge.
        for event in events {
            match *event {
                HostEvent::Position { tempo, speed, .. } => {
                    transport::apply_position(tempo, speed, &mut self.clock, &mut self.sequencer);
                }
                HostEvent::Midi(ref raw) => {
                    for msg in MidiParser::new(raw.bytes()) {
                        self.bridge.handle_message(&msg, &mut self.pattern);
                    }
                }
            }
        }

        // 3. Editor coordinate channel.
        match self.editor.decode_coords(controls.grid_x, controls.grid_y) {
            Some(EditorCommand::ToggleCell { step, row }) => {
                let pitch = self.pattern.pitch_offset() + row;
                if self.pattern.toggle(step, pitch) {
                    self.bridge.mark_dirty();
                }
            }
            Some(EditorCommand::ResetController) => self.bridge.request_reset(),
            Some(EditorCommand::DeviceInquiry) => self.bridge.request_inquiry(),
            Some(EditorCommand::ClearAll) => {
                self.pattern.clear_all();
                self.bridge.mark_dirty();
            }
            Some(EditorCommand::RecenterPitch) => {
                self.pattern.set_pitch_offset(DEFAULT_PITCH_OFFSET);
                self.bridge.mark_dirty();
            }
            None => {}
        }

        // 4. Device mode housekeeping (enter/exit sysex, inquiries).
        self.bridge.run_mode_cycle(&mut out.midi, &mut out.device);

        // 5. Playback.  Stop-edge releases always lead at offset 0, then the
        //    first-run step, then whatever boundaries this window crosses —
        //    offsets come out non-decreasing by construction.
        self.sequencer.flush_pending(&mut out.midi);

        if self.clock.is_playing() && self.sequencer.take_first_run() {
            let step = self.clock.current_step(self.pattern.sequence_length());
            self.sequencer.play_step(&self.pattern, step, 0, &mut out.midi);
        }
        for crossing in self.clock.advance(n_samples) {
            match crossing.kind {
                CrossingKind::StepStart => {
                    let step = self
                        .clock
                        .step_at(crossing.frame, self.pattern.sequence_length());
                    self.sequencer
                        .play_step(&self.pattern, step, crossing.offset, &mut out.midi);
                }
                CrossingKind::MidStep => {
                    self.sequencer.release_step(crossing.offset, &mut out.midi);
                }
            }
        }

        // 6. LED repaint when the hardware view went stale.
        let current_step = self.current_step();
        if self.bridge.needs_refresh(current_step) {
            self.bridge
                .refresh_leds(&self.pattern, current_step, &mut out.device);
        }

        // 7. Editor surfaces: viewport blob on mutation, then the scalars.
        if self.pattern.revision() != self.notified_revision {
            self.notified_revision = self.pattern.revision();
            let mut blob = [0u8; VIEWPORT_BYTES];
            self.pattern.write_viewport(&mut blob);
            out.notify.push(0, &blob);
        }
        editor::publish(&self.pattern, current_step, &mut out.controls);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
