/// Sound engine: procedural 8-bit style sound effects via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely
/// (the stub SoundEngine does nothing).

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    pub(super) const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = std::f32::consts::TAU;

    /// Pre-generated WAV buffers for each sound effect.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_jump: Arc<Vec<u8>>,
        sfx_wall_jump: Arc<Vec<u8>>,
        sfx_die: Arc<Vec<u8>>,
        sfx_rumble: Arc<Vec<u8>>,
        sfx_thud: Arc<Vec<u8>>,
        sfx_trap: Arc<Vec<u8>>,
        sfx_clear: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "no audio output; sound disabled");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_jump: Arc::new(make_wav(&gen_sweep(300.0, 700.0, 0.09, 0.22))),
                sfx_wall_jump: Arc::new(make_wav(&gen_sweep(450.0, 1000.0, 0.08, 0.22))),
                sfx_die: Arc::new(make_wav(&gen_die())),
                sfx_rumble: Arc::new(make_wav(&gen_noise(0.10, 0.18, 90.0))),
                sfx_thud: Arc::new(make_wav(&gen_noise(0.06, 0.25, 60.0))),
                sfx_trap: Arc::new(make_wav(&gen_sweep(900.0, 250.0, 0.18, 0.2))),
                sfx_clear: Arc::new(make_wav(&gen_clear())),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        pub fn play_jump(&self) { self.play(&self.sfx_jump); }
        pub fn play_wall_jump(&self) { self.play(&self.sfx_wall_jump); }
        pub fn play_die(&self) { self.play(&self.sfx_die); }
        pub fn play_trigger(&self) { self.play(&self.sfx_rumble); }
        pub fn play_land(&self) { self.play(&self.sfx_thud); }
        pub fn play_trap(&self) { self.play(&self.sfx_trap); }
        pub fn play_clear(&self) { self.play(&self.sfx_clear); }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    /// Linear pitch sweep with a fade-out (jumps rise, the trap falls).
    pub(super) fn gen_sweep(from: f32, to: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = from + (to - from) * t;
                phase += freq / SAMPLE_RATE as f32;
                // Square-ish wave (sine + 3rd harmonic) for retro feel
                let wave = (phase * TAU).sin() * 0.7 + (phase * 3.0 * TAU).sin() * 0.3;
                wave * (1.0 - t) * volume
            })
            .collect()
    }

    /// Low noise burst over a sine body (blocks starting to move or landing).
    pub(super) fn gen_noise(duration: f32, volume: f32, body_freq: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut rng: u32 = 12345;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let tone = (ti * body_freq * TAU).sin();
                // Simple LCG noise
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                (tone * 0.6 + noise * 0.4) * (1.0 - t).powf(1.5) * volume
            })
            .collect()
    }

    /// Death: descending tone
    pub(super) fn gen_die() -> Vec<f32> {
        let notes = [440.0_f32, 370.0, 311.0, 261.0]; // A4→F#4→Eb4→C4
        let mut samples = notes_of(&notes, 0.1, 0.3);
        let fade_len = samples.len() / 4;
        let total = samples.len();
        for (i, s) in samples.iter_mut().enumerate().skip(total - fade_len) {
            *s *= (total - i) as f32 / fade_len as f32;
        }
        samples
    }

    /// Level clear: ascending fanfare
    pub(super) fn gen_clear() -> Vec<f32> {
        let mut samples = notes_of(&[523.0, 659.0, 784.0], 0.09, 0.3);
        samples.extend(notes_of(&[1047.0], 0.3, 0.3));
        samples
    }

    fn notes_of(notes: &[f32], note_dur: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * note_dur) as usize;
        notes
            .iter()
            .flat_map(|&freq| {
                (0..n).map(move |i| {
                    let t = i as f32 / SAMPLE_RATE as f32;
                    let env = 1.0 - (i as f32 / n as f32) * 0.3;
                    let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 2.0 * TAU).sin() * 0.3;
                    wave * env * volume
                })
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    pub(super) fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: no-ops when the sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_jump(&self) {}
    pub fn play_wall_jump(&self) {}
    pub fn play_die(&self) {}
    pub fn play_trigger(&self) {}
    pub fn play_land(&self) {}
    pub fn play_trap(&self) {}
    pub fn play_clear(&self) {}
}
