//! Standalone host harness: drives the sequencer core from a real audio
//! callback and wires it to real MIDI ports.  This is the collaborator the
//! core's contract assumes, not part of the core — it may allocate, lock
//! and print.  Build with `--features host`.

#[cfg(feature = "host")]
mod host {
    use std::sync::{Arc, Mutex};

    use anyhow::{anyhow, Result};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};

    use grid_seq::{ControlsIn, GridSeq, HostEvent, MidiEvent, Outputs};

    /// Everything the audio callback needs behind one lock, the same shape
    /// the audio thread of any small host uses for its engine state.
    struct Shared {
        engine:  GridSeq,
        outputs: Outputs,
        inbox:   Vec<HostEvent>,
    }

    fn open_midi_out(label: &str, match_name: Option<&str>) -> Result<MidiOutputConnection> {
        let out = MidiOutput::new(label)?;
        let ports = out.ports();
        let port = match match_name {
            Some(name) => ports
                .iter()
                .find(|p| {
                    out.port_name(p)
                        .map(|n| n.to_lowercase().contains(&name.to_lowercase()))
                        .unwrap_or(false)
                })
                .or_else(|| ports.first()),
            None => ports.first(),
        }
        .ok_or_else(|| anyhow!("no MIDI output ports available"))?;
        eprintln!("{}: -> {}", label, out.port_name(port)?);
        Ok(out.connect(port, label).map_err(|e| anyhow!("{e}"))?)
    }

    fn open_midi_in(
        shared: Arc<Mutex<Shared>>,
        match_name: Option<&str>,
    ) -> Result<MidiInputConnection<()>> {
        let input = MidiInput::new("grid-seq in")?;
        let ports = input.ports();
        let port = match match_name {
            Some(name) => ports
                .iter()
                .find(|p| {
                    input
                        .port_name(p)
                        .map(|n| n.to_lowercase().contains(&name.to_lowercase()))
                        .unwrap_or(false)
                })
                .or_else(|| ports.first()),
            None => ports.first(),
        }
        .ok_or_else(|| anyhow!("no MIDI input ports available"))?;
        eprintln!("grid-seq in: <- {}", input.port_name(port)?);

        let connection = input
            .connect(
                port,
                "grid-seq in",
                move |_stamp, bytes, _| {
                    // Queue for the next tick; offsets within the buffer are
                    // beyond what a rawmidi stream can tell us, so 0.
                    if let Ok(mut shared) = shared.lock() {
                        shared.inbox.push(HostEvent::Midi(MidiEvent::new(0, bytes)));
                    }
                },
                (),
            )
            .map_err(|e| anyhow!("{e}"))?;
        Ok(connection)
    }

    pub fn run() -> Result<()> {
        let device_filter = std::env::args().nth(1);
        let filter = device_filter.as_deref();

        let audio_host = cpal::default_host();
        let device = audio_host
            .default_output_device()
            .ok_or_else(|| anyhow!("no audio output device"))?;
        let config = device.default_output_config()?;
        let sample_rate = f64::from(config.sample_rate().0);
        let channels = config.channels() as usize;

        let mut engine = GridSeq::new(sample_rate)?;
        engine.activate();

        let shared = Arc::new(Mutex::new(Shared {
            engine,
            outputs: Outputs::new(),
            inbox: Vec::with_capacity(64),
        }));

        let _midi_in = open_midi_in(Arc::clone(&shared), filter)?;
        let mut synth_out = open_midi_out("grid-seq out", None)?;
        let mut pad_out = open_midi_out("grid-seq pads", filter.or(Some("launchpad")))?;

        let controls = ControlsIn::default();
        let callback_shared = Arc::clone(&shared);
        let mut pending: Vec<HostEvent> = Vec::with_capacity(64);

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                data.fill(0.0);
                let n_samples = (data.len() / channels.max(1)) as u32;

                let mut shared = match callback_shared.lock() {
                    Ok(s) => s,
                    Err(_) => return,
                };
                let shared = &mut *shared;

                pending.clear();
                pending.append(&mut shared.inbox);
                shared
                    .engine
                    .tick(n_samples, &pending, &controls, &mut shared.outputs);

                // Flush; ordering within a buffer is preserved, the
                // sample offsets collapse to "now" on a rawmidi port.
                for ev in shared.outputs.midi.iter() {
                    let _ = synth_out.send(ev.bytes());
                }
                for ev in shared.outputs.device.iter() {
                    let _ = pad_out.send(ev.bytes());
                }
            },
            |err| eprintln!("audio stream error: {err}"),
            None,
        )?;
        stream.play()?;

        eprintln!("running — step through patterns on the pads, Ctrl-C to quit");
        loop {
            std::thread::sleep(std::time::Duration::from_secs(1));
            if let Ok(shared) = shared.lock() {
                eprint!("\rstep {:2}", shared.engine.current_step());
            }
        }
    }
}

#[cfg(feature = "host")]
fn main() -> anyhow::Result<()> {
    host::run()
}

#[cfg(not(feature = "host"))]
fn main() {
    eprintln!("the standalone harness needs the 'host' feature:");
    eprintln!("    cargo run --features host [midi-port-filter]");
    std::process::exit(1);
}
