//! External decoder subprocess
//!
//! Launches the radio decoder pipeline and exposes its stdout as a
//! line stream. The decoder's only contract is "newline-delimited
//! text, order-preserving, best-effort"; everything else about it is
//! out of scope.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};

use crate::error::{Error, Result};

/// Decoder subprocess configuration
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Shell pipeline producing FLEX lines on stdout
    pub command: String,

    /// How long to wait for the decoder to exit after its output pipe
    /// closes before force-killing it
    pub kill_grace: Duration,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            command: "rtl_fm -f 169.65M -M fm -s 22050 -p 83 -g 30 \
                      | multimon-ng -a FLEX -t raw -"
                .to_string(),
            kill_grace: Duration::from_secs(5),
        }
    }
}

impl DecoderConfig {
    /// Set the decoder command line
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Set the kill grace period
    pub fn kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }
}

/// Handle to a running decoder subprocess
pub struct DecoderProcess {
    child: Child,
    kill_grace: Duration,
}

impl DecoderProcess {
    /// Spawn the decoder and take its stdout as a line stream.
    ///
    /// stderr is discarded: the demodulator is chatty and its
    /// diagnostics are not part of the protocol.
    pub fn spawn(config: &DecoderConfig) -> Result<(Self, Lines<BufReader<ChildStdout>>)> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&config.command)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::DecoderSpawn(e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::DecoderSpawn("stdout not captured".to_string()))?;

        tracing::info!(command = %config.command, "Decoder started");

        Ok((
            Self {
                child,
                kill_grace: config.kill_grace,
            },
            BufReader::new(stdout).lines(),
        ))
    }

    /// Terminate the decoder.
    ///
    /// The caller drops the line stream first, closing the pipe; most
    /// decoders then exit on their next write. This waits up to the
    /// grace period for that exit and force-kills on timeout. Never
    /// blocks indefinitely.
    pub async fn shutdown(mut self) {
        match tokio::time::timeout(self.kill_grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::info!(status = %status, "Decoder exited");
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Decoder wait failed");
            }
            Err(_) => {
                tracing::warn!("Decoder did not exit within grace period, killing");
                if let Err(e) = self.child.kill().await {
                    tracing::warn!(error = %e, "Decoder kill failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DecoderConfig::default();

        assert!(config.command.contains("multimon-ng"));
        assert!(config.command.contains("FLEX"));
        assert_eq!(config.kill_grace, Duration::from_secs(5));
    }

    #[test]
    fn test_builder_chaining() {
        let config = DecoderConfig::default()
            .command("cat fixture.txt")
            .kill_grace(Duration::from_millis(100));

        assert_eq!(config.command, "cat fixture.txt");
        assert_eq!(config.kill_grace, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_spawn_reads_lines_until_eof() {
        let config = DecoderConfig::default()
            .command("printf 'one\\ntwo\\n'")
            .kill_grace(Duration::from_secs(1));

        let (process, mut lines) = DecoderProcess::spawn(&config).unwrap();

        assert_eq!(lines.next_line().await.unwrap(), Some("one".to_string()));
        assert_eq!(lines.next_line().await.unwrap(), Some("two".to_string()));
        assert_eq!(lines.next_line().await.unwrap(), None);

        drop(lines);
        process.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_kills_lingering_decoder() {
        let config = DecoderConfig::default()
            .command("sleep 30")
            .kill_grace(Duration::from_millis(50));

        let (process, lines) = DecoderProcess::spawn(&config).unwrap();
        drop(lines);

        // sleep ignores the closed pipe; the grace period expires and
        // the kill path runs without hanging the shutdown.
        process.shutdown().await;
    }
}
