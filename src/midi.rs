// ── Status bytes ──────────────────────────────────────────────────────────────

pub const NOTE_OFF:       u8 = 0x80;
pub const NOTE_ON:        u8 = 0x90;
pub const CONTROL_CHANGE: u8 = 0xB0;
pub const SYSEX_START:    u8 = 0xF0;
pub const SYSEX_END:      u8 = 0xF7;

// ── Messages ──────────────────────────────────────────────────────────────────

/// The subset of MIDI the sequencer understands.  Everything else in an input
/// stream is skipped by the parser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn  { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    /// A complete system-exclusive message.  Content is not interpreted —
    /// the only sysex we ever receive are device-inquiry replies.
    SysEx,
}

#[inline]
pub fn note_on(channel: u8, note: u8, velocity: u8) -> [u8; 3] {
    [NOTE_ON | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
}

#[inline]
pub fn note_off(channel: u8, note: u8, velocity: u8) -> [u8; 3] {
    [NOTE_OFF | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
}

#[inline]
pub fn control_change(channel: u8, controller: u8, value: u8) -> [u8; 3] {
    [CONTROL_CHANGE | (channel & 0x0F), controller & 0x7F, value & 0x7F]
}

// ── Parser ────────────────────────────────────────────────────────────────────

/// Pulls well-formed messages out of a raw byte slice.
///
/// Hardware streams arrive as whatever the transport handed over: possibly
/// several messages per read, possibly cut short, possibly with garbage in
/// between.  The parser never fails — on anything it does not recognise it
/// drops one byte and resynchronises on the next status byte.
pub struct MidiParser<'a> {
    bytes: &'a [u8],
    pos:   usize,
}

impl<'a> MidiParser<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Read the two data bytes after a status byte.  `None` (without
    /// consuming them) if either is missing or is itself a status byte, in
    /// which case the caller resynchronises there.
    fn data_pair(&self) -> Option<(u8, u8)> {
        let d1 = *self.bytes.get(self.pos + 1)?;
        let d2 = *self.bytes.get(self.pos + 2)?;
        if d1 >= 0x80 || d2 >= 0x80 {
            return None;
        }
        Some((d1, d2))
    }
}

impl<'a> Iterator for MidiParser<'a> {
    type Item = MidiMessage;

    fn next(&mut self) -> Option<MidiMessage> {
        while self.pos < self.bytes.len() {
            let status = self.bytes[self.pos];
            let channel = status & 0x0F;

            match status & 0xF0 {
                NOTE_ON => {
                    let Some((note, velocity)) = self.data_pair() else {
                        self.pos += 1;
                        continue;
                    };
                    self.pos += 3;
                    return Some(MidiMessage::NoteOn { channel, note, velocity });
                }
                NOTE_OFF => {
                    let Some((note, velocity)) = self.data_pair() else {
                        self.pos += 1;
                        continue;
                    };
                    self.pos += 3;
                    return Some(MidiMessage::NoteOff { channel, note, velocity });
                }
                CONTROL_CHANGE => {
                    let Some((controller, value)) = self.data_pair() else {
                        self.pos += 1;
                        continue;
                    };
                    self.pos += 3;
                    return Some(MidiMessage::ControlChange { channel, controller, value });
                }
                0xF0 if status == SYSEX_START => {
                    // Scan for the end of the body: a proper terminator
                    // completes the message, any other status byte cuts the
                    // sysex short and becomes the resynchronisation point.
                    let body = &self.bytes[self.pos + 1..];
                    match body.iter().position(|&b| b >= 0x80) {
                        Some(end) if body[end] == SYSEX_END => {
                            self.pos += end + 2;
                            return Some(MidiMessage::SysEx);
                        }
                        Some(end) => {
                            self.pos += end + 1;
                        }
                        None => {
                            self.pos = self.bytes.len();
                        }
                    }
                }
                _ => {
                    // Unknown status or a stray data byte: skip one byte.
                    self.pos += 1;
                }
            }
        }
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
