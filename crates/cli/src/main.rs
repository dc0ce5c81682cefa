#![deny(warnings)]

use anyhow::Context;
use clap::{ArgGroup, Parser};
use mood_mirror_core::audio::{AudioSink, NullAudioSink, RodioAudioSink};
use mood_mirror_core::camera::SyntheticCamera;
use mood_mirror_core::config::{
    resolve_optional_string, AppConfig, CameraConfig, ScanPeriod, SpeechLang, StdEnv, TickInterval,
    Volume, DEFAULT_CAMERA_HEIGHT, DEFAULT_CAMERA_WIDTH, DEFAULT_SCAN_PERIOD_MS,
    DEFAULT_SPEECH_LANG, DEFAULT_SPEECH_VOLUME, DEFAULT_TICK_MS, ENV_DETECTOR_URL,
};
use mood_mirror_core::detector::{
    detection_with_expressions, FaceDetector, RemoteDetector, ScriptStep, ScriptedDetector,
};
use mood_mirror_core::effects::TracingParticleSink;
use mood_mirror_core::emotion::Emotion;
use mood_mirror_core::overlay::TracingOverlaySink;
use mood_mirror_core::session::Session;
use mood_mirror_core::speech::HumVoice;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// How long the built-in demo holds each emotion before moving on.
const DEMO_HOLD_TICKS: usize = 30;
const DEMO_GAP_TICKS: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "mood-mirror")]
#[command(about = "Real-time emotion mirror (detect -> react with overlay, tones, speech)")]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .multiple(false)
        .args(["detector_url", "demo"])
))]
struct Args {
    /// Base URL of the face/expression inference service.
    #[arg(long, env = ENV_DETECTOR_URL)]
    detector_url: Option<String>,

    /// Run against a built-in scripted detector instead of a live service.
    #[arg(long)]
    demo: bool,

    #[arg(long, default_value_t = DEFAULT_TICK_MS)]
    tick_ms: u64,

    #[arg(long, default_value_t = DEFAULT_SCAN_PERIOD_MS)]
    scan_period_ms: u64,

    #[arg(long, default_value = DEFAULT_SPEECH_LANG)]
    lang: String,

    #[arg(long, default_value_t = DEFAULT_SPEECH_VOLUME)]
    volume: f32,

    #[arg(long, default_value_t = DEFAULT_CAMERA_WIDTH)]
    width: u32,

    #[arg(long, default_value_t = DEFAULT_CAMERA_HEIGHT)]
    height: u32,

    /// Stop after this many seconds; runs until ctrl-c when omitted.
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Disable all audio output (tones, sweeps, speech).
    #[arg(long)]
    mute: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let env = StdEnv;
    let run_for = args.duration_secs.map(Duration::from_secs);
    let mute = args.mute;
    let demo = args.demo;
    let cfg = build_config(args, &env)?;

    tracing::info!(
        tick_ms = cfg.tick.period_ms,
        scan_period_ms = cfg.scan_period.period_ms,
        lang = cfg.speech_lang.as_str(),
        demo,
        "config loaded"
    );

    run_session(cfg, demo, mute, run_for).await
}

async fn run_session(
    cfg: AppConfig,
    demo: bool,
    mute: bool,
    run_for: Option<Duration>,
) -> anyhow::Result<()> {
    let detector: Arc<dyn FaceDetector> = if demo {
        Arc::new(demo_detector())
    } else {
        let url = cfg
            .detector_url
            .as_deref()
            .context("detector URL is required unless --demo is set")?;
        Arc::new(RemoteDetector::new(url)?)
    };

    let audio: Arc<dyn AudioSink> = if mute {
        Arc::new(NullAudioSink::new())
    } else {
        Arc::new(RodioAudioSink::new())
    };

    let session = Session {
        camera: SyntheticCamera::new(cfg.camera),
        detector,
        overlay: Arc::new(TracingOverlaySink),
        audio: audio.clone(),
        voice: Arc::new(HumVoice::new(audio)),
        particles: Arc::new(TracingParticleSink),
        config: cfg,
    };

    session.run(run_for).await?;
    Ok(())
}

/// Scripted detector that walks every emotion in turn, with a short
/// no-face gap between each so the announcer re-arms on a real change.
fn demo_detector() -> ScriptedDetector {
    let mut steps = Vec::new();
    for emotion in Emotion::ALL {
        for _ in 0..DEMO_HOLD_TICKS {
            steps.push(ScriptStep::Faces(vec![detection_with_expressions(&[(
                emotion.label(),
                0.9,
            )])]));
        }
        for _ in 0..DEMO_GAP_TICKS {
            steps.push(ScriptStep::Empty);
        }
    }
    ScriptedDetector::cycling(steps)
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn build_config(args: Args, env: &impl mood_mirror_core::config::Env) -> anyhow::Result<AppConfig> {
    if !args.demo && args.detector_url.is_none() && env.var(ENV_DETECTOR_URL).is_none() {
        anyhow::bail!("one of --detector-url or --demo must be provided");
    }

    Ok(AppConfig {
        detector_url: resolve_optional_string(args.detector_url, ENV_DETECTOR_URL, env),
        tick: TickInterval::new(args.tick_ms)?,
        scan_period: ScanPeriod::new(args.scan_period_ms)?,
        speech_lang: SpeechLang::new(args.lang)?,
        speech_volume: Volume::new(args.volume)?,
        camera: CameraConfig {
            width: args.width,
            height: args.height,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mood_mirror_core::config::MapEnv;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).expect("parse")
    }

    #[test]
    fn demo_flag_satisfies_the_source_group() {
        let args = parse(&["mood-mirror", "--demo"]);
        let cfg = build_config(args, &MapEnv::default()).expect("config");
        assert_eq!(cfg.detector_url, None);
        assert_eq!(cfg.tick.period_ms, DEFAULT_TICK_MS);
        assert_eq!(cfg.speech_lang.as_str(), DEFAULT_SPEECH_LANG);
    }

    #[test]
    fn detector_url_env_fallback_applies() {
        let args = parse(&["mood-mirror", "--demo"]);
        let env = MapEnv::default().with_var(ENV_DETECTOR_URL, "http://faces:9000");
        let cfg = build_config(args, &env).expect("config");
        assert_eq!(cfg.detector_url.as_deref(), Some("http://faces:9000"));
    }

    #[test]
    fn zero_tick_is_rejected() {
        let args = parse(&["mood-mirror", "--demo", "--tick-ms", "0"]);
        assert!(build_config(args, &MapEnv::default()).is_err());
    }

    #[test]
    fn out_of_range_volume_is_rejected() {
        let args = parse(&["mood-mirror", "--demo", "--volume", "1.5"]);
        assert!(build_config(args, &MapEnv::default()).is_err());
    }

    #[test]
    fn source_group_requires_one_of_url_or_demo() {
        assert!(Args::try_parse_from(["mood-mirror"]).is_err());
        assert!(Args::try_parse_from([
            "mood-mirror",
            "--demo",
            "--detector-url",
            "http://x:1"
        ])
        .is_err());
    }
}
