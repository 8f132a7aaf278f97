//! Interactive questions asked on the terminal.

use anyhow::Result;
use dialoguer::Input;
use log::{info, warn};
use photo_ingest_core::config::ensure_directory;
use photo_ingest_core::decision::ClearDecision;
use photo_ingest_core::Error;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use crate::env::normalize_path;

const CLEAR_PROMPT: &str = "Delete existing database records before ingest? (y)es/(n)o";
const CLEAR_HINT: &str = "Please respond with (y)es or (n)o. (Default will count as (y)es)";
const CLEAR_ATTEMPTS: usize = 2;
const PATH_ATTEMPTS: usize = 3;

/// Preferred parent for a prompted photo directory, when writable
const SYSTEM_BASE_DIR: &str = "/var/lib/photo-ingest";

/// Line-based question and answer
pub trait Prompter {
    fn ask(&mut self, prompt: &str) -> io::Result<String>;
    fn say(&mut self, message: &str);
}

/// Reads answers from the terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(dialoguer_io_error)
    }

    fn say(&mut self, message: &str) {
        println!("{}", message);
    }
}

fn dialoguer_io_error(err: dialoguer::Error) -> io::Error {
    match err {
        dialoguer::Error::IO(e) => e,
    }
}

pub fn stdin_is_interactive() -> bool {
    io::stdin().is_terminal()
}

/// `1`, `true`, `y` and `yes` mean clear; anything else keeps
pub fn parse_drop_value(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "y" | "yes"
    )
}

/// How this run decides whether to clear existing records
#[derive(Debug)]
pub enum ClearChoice<P: Prompter> {
    Fixed(bool),
    Ask(P),
}

impl<P: Prompter> ClearDecision for ClearChoice<P> {
    fn should_clear(&mut self) -> photo_ingest_core::Result<bool> {
        match self {
            Self::Fixed(clear) => Ok(*clear),
            Self::Ask(prompter) => ask_clear(prompter),
        }
    }
}

/// Pick the clear decision: flag, then `DROP_COLLECTION`, then the config
/// file, then a prompt when `prompter` is available, otherwise keep
pub fn resolve_clear<P: Prompter>(
    flag: Option<bool>,
    env_value: Option<&str>,
    configured: Option<bool>,
    prompter: Option<P>,
) -> ClearChoice<P> {
    if let Some(clear) = flag.or_else(|| env_value.map(parse_drop_value)).or(configured) {
        return ClearChoice::Fixed(clear);
    }
    match prompter {
        Some(prompter) => ClearChoice::Ask(prompter),
        None => {
            println!("Non-interactive session: keeping existing records by default.");
            ClearChoice::Fixed(false)
        }
    }
}

fn ask_clear<P: Prompter>(prompter: &mut P) -> photo_ingest_core::Result<bool> {
    for attempt in 0..CLEAR_ATTEMPTS {
        let answer = prompter
            .ask(CLEAR_PROMPT)
            .map_err(|e| Error::io("prompt", "<stdin>", e))?;
        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ if attempt == 0 => prompter.say(CLEAR_HINT),
            _ => {}
        }
    }
    info!("No clear answer given; clearing existing records");
    Ok(true)
}

/// Ask for a directory until one can be created; `None` after three refusals
pub fn prompt_for_path<P: Prompter>(
    prompter: &mut P,
    var_name: &str,
    default_path: &Path,
) -> Result<Option<PathBuf>> {
    let prompt = format!("{} [default: {}]", var_name, default_path.display());
    for _ in 0..PATH_ATTEMPTS {
        let answer = prompter.ask(&prompt)?;
        let answer = answer.trim();
        let chosen = if answer.is_empty() {
            default_path.to_path_buf()
        } else {
            normalize_path(Path::new(answer))?
        };
        match ensure_directory(&chosen) {
            Ok(()) => return Ok(Some(chosen)),
            Err(e) => {
                warn!("Rejected {} for {}: {}", chosen.display(), var_name, e);
                prompter.say(&format!("Cannot use {} for {}: {}", chosen.display(), var_name, e));
                prompter.say(&format!("Please provide a different path for {}.", var_name));
            }
        }
    }
    Ok(None)
}

/// `/var/lib/photo-ingest` when it can be created, otherwise `~/photo-ingest`
pub fn default_photos_base_dir() -> PathBuf {
    let preferred = Path::new(SYSTEM_BASE_DIR);
    if can_create_path(preferred) {
        return preferred.to_path_buf();
    }
    dirs::home_dir().unwrap_or_default().join("photo-ingest")
}

fn can_create_path(path: &Path) -> bool {
    if path.exists() {
        return is_writable(path);
    }
    path.parent().is_some_and(is_writable)
}

#[cfg(unix)]
fn is_writable(path: &Path) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call
    unsafe { libc::access(c_path.as_ptr(), libc::W_OK | libc::X_OK) == 0 }
}

#[cfg(not(unix))]
fn is_writable(_path: &Path) -> bool {
    false
}
