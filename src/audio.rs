//! Sound cues and the Web Audio backend
//!
//! Simulations only name a cue; the platform decides how (and whether) to
//! play it. Tones are generated with oscillators, no audio files.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

/// Simon pad tones (Hz), one per slot
pub const PAD_FREQS: [f32; 4] = [392.0, 494.0, 587.0, 784.0];

/// Something worth a sound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    /// Colored pad lit or pressed (0-based)
    Pad(u8),
    /// Wrong input or a missed timing
    Miss,
    /// Bonus points
    Score,
    Jump,
    Dash,
    /// Tiles merged
    Merge,
    GameOver,
}

impl SoundCue {
    /// Base oscillator frequency for the cue
    pub fn frequency(&self) -> f32 {
        match *self {
            SoundCue::Pad(n) => PAD_FREQS.get(n as usize).copied().unwrap_or(440.0),
            SoundCue::Miss => 140.0,
            SoundCue::Score => 880.0,
            SoundCue::Jump => 330.0,
            SoundCue::Dash => 220.0,
            SoundCue::Merge => 660.0,
            SoundCue::GameOver => 400.0,
        }
    }
}

/// Plays cues
pub trait AudioSink {
    fn play(&self, cue: SoundCue);
}

/// Sink that remembers what it was asked to play (headless runs, tests)
#[derive(Debug, Default)]
pub struct CueLog {
    cues: RefCell<Vec<SoundCue>>,
}

impl CueLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cues(&self) -> Vec<SoundCue> {
        self.cues.borrow().clone()
    }
}

impl AudioSink for CueLog {
    fn play(&self, cue: SoundCue) {
        self.cues.borrow_mut().push(cue);
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::WebAudio;

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::Cell;

    use web_sys::{AudioContext, AudioContextState, GainNode, OscillatorNode, OscillatorType};

    use super::{AudioSink, SoundCue};
    use crate::settings::Settings;

    /// Oscillator tones through a shared `AudioContext`
    pub struct WebAudio {
        ctx: Option<AudioContext>,
        volume: f32,
        enabled: Cell<bool>,
    }

    impl WebAudio {
        pub fn new(settings: &Settings) -> Self {
            // Fails outside a secure context
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            Self {
                ctx,
                volume: settings.master_volume.clamp(0.0, 1.0),
                enabled: Cell::new(settings.sound),
            }
        }

        /// Mute or unmute without tearing down the context
        pub fn set_enabled(&self, on: bool) {
            self.enabled.set(on);
        }

        fn create_osc(
            ctx: &AudioContext,
            freq: f32,
            osc_type: OscillatorType,
        ) -> Option<(OscillatorNode, GainNode)> {
            let osc = ctx.create_oscillator().ok()?;
            let gain = ctx.create_gain().ok()?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&ctx.destination()).ok()?;

            Some((osc, gain))
        }

        /// Short enveloped tone starting `delay` seconds from now
        fn tone(&self, ctx: &AudioContext, freq: f32, osc_type: OscillatorType, peak: f32, len: f64, delay: f64) {
            let Some((osc, gain)) = Self::create_osc(ctx, freq, osc_type) else {
                return;
            };
            let t = ctx.current_time() + delay;
            gain.gain().set_value_at_time(0.0001, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(peak * self.volume, t + 0.01)
                .ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.0001, t + len)
                .ok();
            osc.start_with_when(t).ok();
            osc.stop_with_when(t + len + 0.02).ok();
        }
    }

    impl AudioSink for WebAudio {
        fn play(&self, cue: SoundCue) {
            if !self.enabled.get() || self.volume <= 0.0 {
                return;
            }
            let Some(ctx) = &self.ctx else { return };

            // Browsers keep the context suspended until a user gesture
            if ctx.state() == AudioContextState::Suspended {
                let _ = ctx.resume();
            }

            let freq = cue.frequency();
            match cue {
                SoundCue::Pad(_) => self.tone(ctx, freq, OscillatorType::Sine, 0.08, 0.14, 0.0),
                SoundCue::Miss => self.tone(ctx, freq, OscillatorType::Sawtooth, 0.06, 0.10, 0.0),
                SoundCue::Score | SoundCue::Merge => {
                    self.tone(ctx, freq, OscillatorType::Triangle, 0.08, 0.08, 0.0)
                }
                SoundCue::Jump | SoundCue::Dash => {
                    self.tone(ctx, freq, OscillatorType::Square, 0.05, 0.06, 0.0)
                }
                SoundCue::GameOver => {
                    for (i, f) in [400.0, 350.0, 300.0, 200.0].iter().enumerate() {
                        self.tone(ctx, *f, OscillatorType::Sine, 0.08, 0.3, i as f64 * 0.2);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_frequencies() {
        assert_eq!(SoundCue::Pad(0).frequency(), 392.0);
        assert_eq!(SoundCue::Pad(3).frequency(), 784.0);
        assert_eq!(SoundCue::Pad(9).frequency(), 440.0);
    }

    #[test]
    fn test_cue_log_records_in_order() {
        let log = CueLog::new();
        log.play(SoundCue::Jump);
        log.play(SoundCue::GameOver);
        assert_eq!(log.cues(), vec![SoundCue::Jump, SoundCue::GameOver]);
    }
}
