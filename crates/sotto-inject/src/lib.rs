//! Sotto inject crate - delivering transcribed text to the focused
//! application.
//!
//! Two backends: Unicode input events via Win32 `SendInput` (default, sends
//! each UTF-16 code unit as a down+up pair in bounded batches), and
//! keystroke simulation via enigo (compatible with applications that
//! mishandle raw Unicode injection, at the cost of potentially triggering
//! keyboard shortcuts).

use std::time::Duration;

use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use tracing::debug;

use sotto_core::{Result, SottoError};

/// Available text injection methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionMethod {
    /// Win32 SendInput with Unicode events.
    SendInput,
    /// Simulated keystrokes.
    Keystroke,
}

impl InjectionMethod {
    /// Parse the configuration string ("sendinput" | "keystroke").
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "sendinput" => Ok(InjectionMethod::SendInput),
            "keystroke" => Ok(InjectionMethod::Keystroke),
            other => Err(SottoError::Config(format!(
                "Unknown injection method '{}' (expected sendinput or keystroke)",
                other
            ))),
        }
    }
}

/// Pacing and batching constants for text injection.
///
/// The delays are reliability tuning, not correctness guarantees: the
/// settle delay lets focus land on the target window, the batch delay
/// keeps slow applications from dropping input.
#[derive(Debug, Clone)]
pub struct InjectorTuning {
    /// Maximum characters per input-event batch.
    pub batch_chars: usize,
    /// Delay before the first batch.
    pub settle_delay: Duration,
    /// Delay between batches.
    pub batch_delay: Duration,
}

impl Default for InjectorTuning {
    fn default() -> Self {
        Self {
            batch_chars: 20,
            settle_delay: Duration::from_millis(50),
            batch_delay: Duration::from_millis(4),
        }
    }
}

/// Split text into batches of UTF-16 code units.
///
/// Batch boundaries fall on character boundaries; characters beyond the
/// basic multilingual plane expand to their two surrogate units within the
/// same batch.
pub fn batch_units(text: &str, batch_chars: usize) -> Vec<Vec<u16>> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(batch_chars.max(1))
        .map(|chunk| {
            let mut units = Vec::with_capacity(chunk.len());
            let mut buf = [0u16; 2];
            for ch in chunk {
                units.extend_from_slice(ch.encode_utf16(&mut buf));
            }
            units
        })
        .collect()
}

/// Types text into the currently focused application.
pub struct TextInjector {
    method: InjectionMethod,
    tuning: InjectorTuning,
}

impl TextInjector {
    pub fn new(method: InjectionMethod) -> Self {
        Self::with_tuning(method, InjectorTuning::default())
    }

    pub fn with_tuning(method: InjectionMethod, tuning: InjectorTuning) -> Self {
        Self { method, tuning }
    }

    pub fn method(&self) -> InjectionMethod {
        self.method
    }

    /// Type text into the active application. Empty text is a no-op success.
    pub fn type_text(&self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        debug!(chars = text.chars().count(), method = ?self.method, "Injecting text");
        match self.method {
            InjectionMethod::SendInput => self.type_via_sendinput(text),
            InjectionMethod::Keystroke => self.type_via_keystroke(text),
        }
    }

    fn type_via_sendinput(&self, text: &str) -> Result<()> {
        let batches = batch_units(text, self.tuning.batch_chars);

        std::thread::sleep(self.tuning.settle_delay);
        for (i, batch) in batches.iter().enumerate() {
            send_unicode_batch(batch)?;
            if !self.tuning.batch_delay.is_zero() && i + 1 < batches.len() {
                std::thread::sleep(self.tuning.batch_delay);
            }
        }
        Ok(())
    }

    fn type_via_keystroke(&self, text: &str) -> Result<()> {
        std::thread::sleep(self.tuning.settle_delay);
        let mut enigo = Enigo::new(&Settings::default())
            .map_err(|e| SottoError::Injection(format!("Failed to open input handle: {}", e)))?;
        enigo
            .text(text)
            .map_err(|e| SottoError::Injection(format!("Keystroke simulation failed: {}", e)))
    }

    /// Press and release the Enter key.
    pub fn press_enter(&self) -> Result<()> {
        let mut enigo = Enigo::new(&Settings::default())
            .map_err(|e| SottoError::Injection(format!("Failed to open input handle: {}", e)))?;
        enigo
            .key(Key::Return, Direction::Click)
            .map_err(|e| SottoError::Injection(format!("Enter key press failed: {}", e)))
    }
}

/// Send one batch of UTF-16 units as Unicode down+up input event pairs.
#[cfg(target_os = "windows")]
fn send_unicode_batch(units: &[u16]) -> Result<()> {
    use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
        SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYEVENTF_KEYUP,
        KEYEVENTF_UNICODE,
    };

    let mut inputs: Vec<INPUT> = Vec::with_capacity(units.len() * 2);
    for &unit in units {
        for flags in [KEYEVENTF_UNICODE, KEYEVENTF_UNICODE | KEYEVENTF_KEYUP] {
            inputs.push(INPUT {
                r#type: INPUT_KEYBOARD,
                Anonymous: INPUT_0 {
                    ki: KEYBDINPUT {
                        wVk: 0,
                        wScan: unit,
                        dwFlags: flags,
                        time: 0,
                        dwExtraInfo: 0,
                    },
                },
            });
        }
    }

    let sent = unsafe {
        SendInput(
            inputs.len() as u32,
            inputs.as_ptr(),
            std::mem::size_of::<INPUT>() as i32,
        )
    };

    if sent as usize != inputs.len() {
        return Err(SottoError::Injection(format!(
            "SendInput only sent {} of {} events",
            sent,
            inputs.len()
        )));
    }
    Ok(())
}

/// SendInput is a Win32 primitive; other platforms use the keystroke method.
#[cfg(not(target_os = "windows"))]
fn send_unicode_batch(_units: &[u16]) -> Result<()> {
    Err(SottoError::Injection(
        "SendInput injection is only available on Windows".to_string(),
    ))
}

// =============================================================================
// Tests
// =============================================================================
