//! grid-seq — a grid-based MIDI step sequencer core.
//!
//! A 16-step × 128-pitch pattern, a sample-accurate tempo clock and the
//! glue that keeps an 8×8 pad controller and an external editor mirrored to
//! it.  The host drives everything through [`GridSeq::tick`], which runs in
//! bounded time with no allocation: input events and scalar controls go in,
//! timestamped MIDI and LED events come out through preallocated buffers.
//!
//! The host shim (audio callback, port plumbing) lives outside this crate;
//! a minimal standalone harness ships behind the `host` feature.

pub mod clock;
pub mod editor;
pub mod engine;
pub mod events;
pub mod launchpad;
pub mod midi;
pub mod pattern;
pub mod save;
pub mod sequencer;
pub mod transport;

pub use clock::{Clock, Crossing, CrossingKind};
pub use editor::{ControlsIn, ControlsOut, EditorCommand, EditorSync};
pub use engine::{GridSeq, Outputs};
pub use events::{EventBuffer, HostEvent, MidiEvent};
pub use launchpad::{LaunchpadBridge, PadColor};
pub use midi::{MidiMessage, MidiParser};
pub use pattern::{
    Pattern, DEFAULT_PITCH_OFFSET, DEFAULT_SEQUENCE_LENGTH, MAX_STEPS, PITCH_RANGE, VISIBLE_ROWS,
};
pub use save::PatternSnapshot;
pub use sequencer::{NoteSet, Sequencer};
