//! Speech engine backed by espeak-ng.
//!
//! espeak-ng plays through its own audio output in synchronous mode, so an
//! utterance blocks a worker thread until it finishes or is cancelled.
//! The library has no pause: pausing cancels the utterance and resuming is
//! reported as unsupported.

use super::{EngineError, EngineEvent, EngineEventTx, SpeechEngine, Utterance, Voice};
use crate::sources::PoisonlessLock;
use async_trait::async_trait;
use espeakng_sys::*;
use lazy_static::lazy_static;
use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

const BUFF_LEN: i32 = 500;
const OPTIONS: i32 = 0;
const DEFAULT_VOICE: &str = "ja";

/// espeak-ng words per minute at rate 1.0
const BASE_WPM: f32 = 175.0;

lazy_static! {
    /// espeak-ng is a process-wide singleton. `None` until initialised,
    /// `Some(false)` when initialisation failed.
    static ref INITIALIZED: Mutex<Option<bool>> = Mutex::new(None);

    /// Held for the duration of a synthesis call.
    static ref SYNTH_LOCK: Mutex<()> = Mutex::new(());
}

pub struct EspeakEngine {
    /// Bumped on every speak/cancel, a finishing utterance only reports
    /// `Finished` if it is still the current one.
    generation: Arc<AtomicU64>,
}

impl Default for EspeakEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EspeakEngine {
    pub fn new() -> Self {
        EspeakEngine {
            generation: Arc::new(AtomicU64::new(0)),
        }
    }
}

fn initialize() -> bool {
    let mut initialized = INITIALIZED.plock();

    if let Some(ok) = *initialized {
        return ok;
    }

    let output: espeak_AUDIO_OUTPUT = espeak_AUDIO_OUTPUT_AUDIO_OUTPUT_SYNCH_PLAYBACK;
    let path: *const c_char = std::ptr::null();
    let sample_rate = unsafe { espeak_Initialize(output, BUFF_LEN, path, OPTIONS) };

    let ok = sample_rate > 0;
    if ok {
        info!("espeak-ng initialised at {sample_rate} Hz");
    } else {
        warn!("espeak-ng failed to initialise ({sample_rate})");
    }

    *initialized = Some(ok);
    ok
}

fn list_voices() -> Vec<Voice> {
    let mut voices = Vec::new();

    unsafe {
        let list = espeak_ListVoices(std::ptr::null_mut());
        if list.is_null() {
            return voices;
        }

        let mut index = 0;
        loop {
            let voice = *list.add(index);
            if voice.is_null() {
                break;
            }

            let name = CStr::from_ptr((*voice).name).to_string_lossy().into_owned();
            // The language list starts with a priority byte
            let languages = (*voice).languages;
            let lang = if languages.is_null() {
                String::new()
            } else {
                CStr::from_ptr(languages.add(1))
                    .to_string_lossy()
                    .into_owned()
            };

            voices.push(Voice { name, lang });
            index += 1;
        }
    }

    voices
}

fn synthesize(utterance: &Utterance) -> Result<(), EngineError> {
    let _guard = SYNTH_LOCK.plock();

    let voice_name = utterance.voice.as_deref().unwrap_or(DEFAULT_VOICE);
    let voice_name_cstr =
        CString::new(voice_name).map_err(|e| EngineError::Failed(e.to_string()))?;

    let rate = (BASE_WPM * utterance.rate).round() as i32;
    let volume = (100.0 * utterance.volume).round() as i32;
    let pitch = (50.0 * utterance.pitch).round() as i32;

    unsafe {
        if espeak_SetVoiceByName(voice_name_cstr.as_ptr()) != espeak_ERROR_EE_OK {
            warn!("espeak-ng has no voice named {voice_name}, using its default");
        }
        espeak_SetParameter(espeak_PARAMETER_espeakRATE, rate, 0);
        espeak_SetParameter(espeak_PARAMETER_espeakVOLUME, volume, 0);
        espeak_SetParameter(espeak_PARAMETER_espeakPITCH, pitch, 0);
    }

    // Filter out null bytes to prevent CString::new from failing
    let filtered_text: String = utterance.text.chars().filter(|&c| c != '\0').collect();
    let text_len = filtered_text.len() + 1;
    let text_cstr = CString::new(filtered_text).map_err(|e| EngineError::Failed(e.to_string()))?;

    let result = unsafe {
        espeak_Synth(
            text_cstr.as_ptr() as *const c_void,
            text_len,
            0,
            0,
            0,
            espeakCHARS_AUTO,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
        )
    };

    if result != espeak_ERROR_EE_OK {
        return Err(EngineError::Failed(format!("espeak_Synth returned {result}")));
    }

    match unsafe { espeak_Synchronize() } {
        espeak_ERROR_EE_OK => Ok(()),
        other => Err(EngineError::Failed(format!(
            "espeak_Synchronize returned {other}"
        ))),
    }
}

#[async_trait]
impl SpeechEngine for EspeakEngine {
    fn is_available(&self) -> bool {
        initialize()
    }

    async fn voices(&self) -> Result<Vec<Voice>, EngineError> {
        if !self.is_available() {
            return Err(EngineError::Unavailable);
        }

        tokio::task::spawn_blocking(list_voices)
            .await
            .map_err(|e| EngineError::Failed(format!("voice listing task failed: {e}")))
    }

    fn speak(&self, utterance: &Utterance, events: EngineEventTx) -> Result<(), EngineError> {
        if !self.is_available() {
            return Err(EngineError::Unavailable);
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let utterance = utterance.clone();
        let current = self.generation.clone();

        tokio::task::spawn_blocking(move || {
            // A closed receiver means the source already cancelled this pass
            let _ = events.send(EngineEvent::Started);

            let result = synthesize(&utterance);

            if current.load(Ordering::SeqCst) != generation {
                return;
            }

            let _ = match result {
                Ok(()) => events.send(EngineEvent::Finished),
                Err(e) => events.send(EngineEvent::Failed(e.to_string())),
            };
        });

        Ok(())
    }

    fn pause(&self) -> Result<(), EngineError> {
        self.cancel();
        Ok(())
    }

    fn resume(&self) -> Result<(), EngineError> {
        Err(EngineError::Unsupported("resume"))
    }

    fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);

        if *INITIALIZED.plock() != Some(true) {
            return;
        }

        let result = unsafe { espeak_Cancel() };
        if result != espeak_ERROR_EE_OK {
            error!("espeak_Cancel returned {result}");
        }
    }
}
