use std::{process::Command, thread};

use crate::{AnnouncementChannel, ContentController, Result, TunerError};

/// Drives an MPD instance through the `mpc` command line client.
#[derive(Debug, Clone)]
pub struct MpcController {
    program: String,
}

impl MpcController {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, what: &'static str, args: &[&str]) -> Result<()> {
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|err| TunerError::collaborator(what, format!("{}: {err}", self.program)))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(TunerError::collaborator(
                what,
                format!("{} ({})", stderr.trim(), output.status),
            ))
        }
    }
}

impl ContentController for MpcController {
    fn add_and_play(&mut self, uri: &str) -> Result<()> {
        self.run("playlist add", &["add", uri])?;
        self.run("play", &["play"])
    }

    fn clear(&mut self) -> Result<()> {
        self.run("playlist clear", &["clear"])
    }
}

/// Speaks text through an external synthesiser such as `espeak`.
///
/// Each announcement runs on its own detached thread that waits for the
/// child, so the poll loop never blocks on speech.
#[derive(Debug, Clone)]
pub struct SpeechAnnouncer {
    program: String,
}

impl SpeechAnnouncer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl AnnouncementChannel for SpeechAnnouncer {
    fn speak_async(&self, text: &str) {
        let program = self.program.clone();
        let text = text.to_owned();

        let spawned = thread::Builder::new()
            .name("announce".into())
            .spawn(move || match Command::new(&program).arg(&text).status() {
                Ok(status) if status.success() => {}
                Ok(status) => tracing::warn!(program = %program, %status, "announcement failed"),
                Err(err) => tracing::warn!(program = %program, %err, "announcement backend unavailable"),
            });

        if let Err(err) = spawned {
            tracing::warn!(%err, "could not start announcement thread");
        }
    }
}
