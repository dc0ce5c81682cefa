pub mod particles;
pub mod tone;

pub use particles::{
    style_for, Dot, ParticleField, ParticleSink, ParticleStyle, RecordingParticleSink,
    TracingParticleSink,
};
pub use tone::{emotion_cue, play_scan_sweep, render_cue, render_scan_sweep, Note, ToneCue};
