// ── Crossings ─────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrossingKind {
    /// The playhead entered a new step.
    StepStart,
    /// The playhead passed the 50% point of a step (note-off time).
    MidStep,
}

/// One boundary crossed during a tick, with its position expressed both as
/// an absolute frame and as a sample offset relative to the tick start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Crossing {
    pub kind:   CrossingKind,
    pub offset: u32,
    pub frame:  u64,
}

// ── Clock ─────────────────────────────────────────────────────────────────────

pub const DEFAULT_TEMPO: f64 = 120.0;

/// Sample-accurate timebase.
///
/// One step is one quarter note at the current tempo, so
/// `frames_per_step = round(sample_rate · 60 / tempo)`.  The frame counter is
/// a u64 incremented by `advance` while playing and reset to zero on
/// `start()`; the current step index is always re-derived from it rather
/// than stored, so tempo changes take effect immediately without replaying
/// or skipping boundaries.
pub struct Clock {
    sample_rate:     f64,
    tempo:           f64,
    frames_per_step: u64,
    frame_counter:   u64,
    playing:         bool,
}

impl Clock {
    pub fn new(sample_rate: f64) -> Self {
        let mut clock = Self {
            sample_rate,
            tempo:           DEFAULT_TEMPO,
            frames_per_step: 1,
            frame_counter:   0,
            playing:         false,
        };
        clock.recalculate();
        clock
    }

    fn recalculate(&mut self) {
        let frames = (self.sample_rate * 60.0 / self.tempo).round();
        self.frames_per_step = (frames as u64).max(1);
    }

    /// Non-positive rates are ignored.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        if sample_rate > 0.0 {
            self.sample_rate = sample_rate;
            self.recalculate();
        }
    }

    /// Non-positive tempos are ignored.  Takes effect on the next `advance`;
    /// the already-elapsed frame count is not rescaled.
    pub fn set_tempo(&mut self, bpm: f64) {
        if bpm > 0.0 {
            self.tempo = bpm;
            self.recalculate();
        }
    }

    #[inline]
    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    #[inline]
    pub fn frames_per_step(&self) -> u64 {
        self.frames_per_step
    }

    #[inline]
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn start(&mut self) {
        self.playing = true;
        self.frame_counter = 0;
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    /// Step index at an arbitrary frame, wrapped to the sequence length.
    #[inline]
    pub fn step_at(&self, frame: u64, sequence_length: u8) -> u8 {
        ((frame / self.frames_per_step) % u64::from(sequence_length.max(1))) as u8
    }

    /// Step index the playhead is on right now.
    #[inline]
    pub fn current_step(&self, sequence_length: u8) -> u8 {
        self.step_at(self.frame_counter, sequence_length)
    }

    /// Move the playhead forward by `n_samples` and return every boundary the
    /// move crossed, in non-decreasing offset order.  A tick shorter than one
    /// step yields at most one crossing of each kind; a longer tick yields
    /// one per boundary so every step still fires at its exact offset.
    ///
    /// While stopped this neither advances nor yields anything.
    pub fn advance(&mut self, n_samples: u32) -> Crossings {
        let f0 = self.frame_counter;
        if !self.playing {
            return Crossings::empty(f0, self.frames_per_step);
        }
        let f1 = f0 + u64::from(n_samples);
        self.frame_counter = f1;
        Crossings::new(f0, f1, self.frames_per_step)
    }
}

/// Iterator over the boundaries inside one `advance` window `[f0, f1)`.
///
/// Step starts fire for boundary frames in `(f0, f1]` — a boundary landing
/// exactly on the end of the window belongs to this tick, and the next tick
/// (which starts at `f1`) will not repeat it.  Mid-step thresholds fire for
/// frames in `[f0, f1)`.  When both land on the same frame the step start is
/// yielded first.
pub struct Crossings {
    f1:        u64,
    base:      u64,
    next_step: u64,
    next_mid:  u64,
    step_len:  u64,
}

impl Crossings {
    fn new(f0: u64, f1: u64, step_len: u64) -> Self {
        let next_step = (f0 / step_len + 1) * step_len;
        let mut next_mid = (f0 / step_len) * step_len + step_len / 2;
        if next_mid < f0 {
            next_mid += step_len;
        }
        Self { f1, base: f0, next_step, next_mid, step_len }
    }

    fn empty(f0: u64, step_len: u64) -> Self {
        Self { f1: f0, base: f0, next_step: f0 + 1, next_mid: f0 + 1, step_len }
    }
}

impl Iterator for Crossings {
    type Item = Crossing;

    fn next(&mut self) -> Option<Crossing> {
        let step_due = self.next_step <= self.f1;
        let mid_due  = self.next_mid < self.f1;

        let kind = match (step_due, mid_due) {
            (false, false) => return None,
            (true,  false) => CrossingKind::StepStart,
            (false, true)  => CrossingKind::MidStep,
            // Tie on the same frame: the step start goes first.
            (true,  true)  => {
                if self.next_step <= self.next_mid {
                    CrossingKind::StepStart
                } else {
                    CrossingKind::MidStep
                }
            }
        };

        let frame = match kind {
            CrossingKind::StepStart => {
                let f = self.next_step;
                self.next_step += self.step_len;
                f
            }
            CrossingKind::MidStep => {
                let f = self.next_mid;
                self.next_mid += self.step_len;
                f
            }
        };

        Some(Crossing { kind, offset: (frame - self.base) as u32, frame })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
