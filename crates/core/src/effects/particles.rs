use crate::emotion::Emotion;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;
use std::sync::Mutex;

/// How a given emotion shapes the ambient particle field. Purely
/// presentational tuning; the neutral style is the fallback for any
/// unmapped or absent emotion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleStyle {
    pub colors: &'static [&'static str],
    pub speed: f32,
    pub size: f32,
    pub spawn_rate: usize,
    pub gravity: f32,
}

const HAPPY: ParticleStyle = ParticleStyle {
    colors: &["#FFD700", "#FFA500", "#FF69B4", "#00FF00"],
    speed: 3.0,
    size: 4.0,
    spawn_rate: 8,
    gravity: 0.1,
};

const SAD: ParticleStyle = ParticleStyle {
    colors: &["#4169E1", "#1E90FF", "#87CEEB"],
    speed: 1.0,
    size: 3.0,
    spawn_rate: 5,
    gravity: 0.3,
};

const ANGRY: ParticleStyle = ParticleStyle {
    colors: &["#FF0000", "#DC143C", "#FF4500"],
    speed: 4.0,
    size: 4.0,
    spawn_rate: 10,
    gravity: 0.2,
};

const FEARFUL: ParticleStyle = ParticleStyle {
    colors: &["#9932CC", "#8B008B", "#FF00FF"],
    speed: 3.5,
    size: 3.0,
    spawn_rate: 7,
    gravity: 0.25,
};

const DISGUSTED: ParticleStyle = ParticleStyle {
    colors: &["#9ACD32", "#7FFF00", "#32CD32"],
    speed: 2.0,
    size: 3.0,
    spawn_rate: 6,
    gravity: 0.15,
};

const SURPRISED: ParticleStyle = ParticleStyle {
    colors: &["#FF6347", "#FFD700", "#00FF00", "#FF1493"],
    speed: 5.0,
    size: 5.0,
    spawn_rate: 15,
    gravity: 0.05,
};

const NEUTRAL: ParticleStyle = ParticleStyle {
    colors: &["#22D3EE", "#06B6D4"],
    speed: 1.5,
    size: 2.0,
    spawn_rate: 3,
    gravity: 0.05,
};

pub fn style_for(emotion: Option<Emotion>) -> &'static ParticleStyle {
    match emotion {
        Some(Emotion::Happy) => &HAPPY,
        Some(Emotion::Sad) => &SAD,
        Some(Emotion::Angry) => &ANGRY,
        Some(Emotion::Fearful) => &FEARFUL,
        Some(Emotion::Disgusted) => &DISGUSTED,
        Some(Emotion::Surprised) => &SURPRISED,
        Some(Emotion::Neutral) | None => &NEUTRAL,
    }
}

#[derive(Clone, Copy, Debug)]
struct Particle {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    size: f32,
    life: f32,
    max_life: f32,
    color: &'static str,
}

/// One rendered particle: position, size, color, and alpha proportional to
/// the remaining-life fraction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dot {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub alpha: f32,
    pub color: &'static str,
}

/// Continuous ambient particle field. Unlike the tone cue this is not
/// edge-triggered: it runs every animation step while the session is active
/// and merely restyles itself from the current emotion.
pub struct ParticleField {
    width: f32,
    height: f32,
    frame: u64,
    particles: Vec<Particle>,
    rng: StdRng,
}

impl ParticleField {
    pub fn new(width: f32, height: f32) -> Self {
        Self::with_rng(width, height, StdRng::from_os_rng())
    }

    /// Deterministic field for tests.
    pub fn with_seed(width: f32, height: f32, seed: u64) -> Self {
        Self::with_rng(width, height, StdRng::seed_from_u64(seed))
    }

    fn with_rng(width: f32, height: f32, rng: StdRng) -> Self {
        Self {
            width,
            height,
            frame: 0,
            particles: Vec::new(),
            rng,
        }
    }

    pub fn live_count(&self) -> usize {
        self.particles.len()
    }

    /// One animation step: spawn on every second frame, then advance and
    /// cull.
    pub fn step(&mut self, emotion: Option<Emotion>) {
        self.frame += 1;
        let style = *style_for(emotion);
        if self.frame % 2 == 0 {
            self.spawn(&style);
        }
        self.advance(&style);
    }

    fn spawn(&mut self, style: &ParticleStyle) {
        for _ in 0..style.spawn_rate {
            let angle = self.rng.random_range(0.0..TAU);
            let speed = style.speed * (0.5 + self.rng.random_range(0.0..1.0));
            let color_idx = self.rng.random_range(0..style.colors.len());
            let max_life = 200.0 + self.rng.random_range(0.0..100.0);

            self.particles.push(Particle {
                x: self.rng.random_range(0.0..1.0) * self.width,
                // New particles enter through the top 30% of the area.
                y: self.rng.random_range(0.0..1.0) * self.height * 0.3,
                vx: angle.cos() * speed * (self.rng.random_range(0.0..1.0) - 0.5) * 2.0,
                vy: angle.sin() * speed + style.speed * 0.5,
                size: style.size * (0.5 + self.rng.random_range(0.0..1.0)),
                life: max_life,
                max_life,
                color: style.colors[color_idx],
            });
        }
    }

    fn advance(&mut self, style: &ParticleStyle) {
        let height = self.height;
        let gravity = style.gravity;
        self.particles.retain_mut(|p| {
            p.life -= 1.0;
            p.vy += gravity;
            p.x += p.vx;
            p.y += p.vy;
            p.life > 0.0 && p.y < height
        });
    }

    pub fn render(&self) -> Vec<Dot> {
        self.particles
            .iter()
            .map(|p| Dot {
                x: p.x,
                y: p.y,
                size: p.size,
                alpha: p.life / p.max_life,
                color: p.color,
            })
            .collect()
    }
}

/// Consumes rendered particle frames; infallible, best-effort.
pub trait ParticleSink: Send + Sync {
    fn render(&self, dots: &[Dot]);
}

/// Logs the live particle count at trace level.
#[derive(Clone, Debug, Default)]
pub struct TracingParticleSink;

impl ParticleSink for TracingParticleSink {
    fn render(&self, dots: &[Dot]) {
        tracing::trace!(live = dots.len(), "particle frame");
    }
}

/// Captures rendered frames, for tests.
#[derive(Debug, Default)]
pub struct RecordingParticleSink {
    frames: Mutex<Vec<Vec<Dot>>>,
}

impl RecordingParticleSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<Vec<Dot>> {
        match self.frames.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ParticleSink for RecordingParticleSink {
    fn render(&self, dots: &[Dot]) {
        match self.frames.lock() {
            Ok(mut g) => g.push(dots.to_vec()),
            Err(poisoned) => poisoned.into_inner().push(dots.to_vec()),
        }
    }
}
