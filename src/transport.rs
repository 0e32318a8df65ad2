use crate::clock::Clock;
use crate::sequencer::Sequencer;

/// Apply one transport (position) event from the host's input stream.
///
/// Tempo forwards to the clock whenever it is positive.  Speed is reduced to
/// a play/stop edge against the clock's current state: starting resets the
/// playhead and arms the first-tick rule, stopping queues the all-notes-off
/// release.  Repeating the same speed is not an edge and does nothing.
pub fn apply_position(
    tempo: Option<f64>,
    speed: Option<f64>,
    clock: &mut Clock,
    sequencer: &mut Sequencer,
) {
    if let Some(bpm) = tempo {
        clock.set_tempo(bpm);
    }

    if let Some(speed) = speed {
        let run = speed > 0.0;
        if run && !clock.is_playing() {
            clock.start();
            sequencer.arm_first_run();
        } else if !run && clock.is_playing() {
            clock.stop();
            sequencer.hold_notes_for_release();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
