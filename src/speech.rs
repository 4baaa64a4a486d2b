//! Spoken feedback, fire-and-forget.
//!
//! A request must never block on audio: the espeak sink spawns the
//! synthesizer detached and a reaper thread waits it out. When no
//! synthesizer is available (or TTS is switched off) feedback goes to
//! the log instead, so the pipeline behaves identically either way.

use std::process::{Command, Stdio};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;

pub trait SpeechSink: Send + Sync {
    fn name(&self) -> &'static str;
    fn say(&self, text: &str);
}

/// Fallback sink: the utterance lands in the log and nowhere else.
pub struct LogSpeech;

impl SpeechSink for LogSpeech {
    fn name(&self) -> &'static str {
        "log"
    }

    fn say(&self, text: &str) {
        info!(text, "tts");
    }
}

/// Speaks through `espeak-ng`, detached from the request.
pub struct EspeakSpeech;

impl SpeechSink for EspeakSpeech {
    fn name(&self) -> &'static str {
        "espeak-ng"
    }

    fn say(&self, text: &str) {
        let spawned = Command::new("espeak-ng")
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(mut child) => {
                // Reap off-thread so the synth never becomes a zombie.
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(e) => warn!(error = %e, "espeak-ng spawn failed"),
        }
    }
}

/// Pick the sink for this process: espeak when allowed and installed,
/// the log otherwise.
pub fn sink_from_config(config: &Config) -> Arc<dyn SpeechSink> {
    if config.tts != "off" && which::which("espeak-ng").is_ok() {
        info!("speech output via espeak-ng");
        return Arc::new(EspeakSpeech);
    }
    info!("speech output via log only");
    Arc::new(LogSpeech)
}

// ── Tests ────────────────────────────────────────────────────────
