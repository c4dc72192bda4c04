//! Replay source - plays a recorded code log
//!
//! File format, one entry per line:
//!
//! ```text
//! # comment
//! 4294961097
//! +1500 4026531841
//! ```
//!
//! An optional `+<millis>` prefix delays the code relative to the previous
//! line. Blank lines and `#` comments are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::time::Duration;

use contracts::{CodeCallback, CodeSource};
use tracing::info;

use super::scripted::{ScriptedSource, ScriptedStep};
use crate::error::{IngestionError, Result};

/// Replay configuration
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Playback speed multiplier (1.0 = recorded pace)
    pub speed_multiplier: f64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
        }
    }
}

/// Replay source
pub struct ReplaySource {
    inner: ScriptedSource,
}

impl ReplaySource {
    /// Load a replay file
    pub fn load(path: &Path, config: ReplayConfig) -> Result<Self> {
        let file = File::open(path)?;
        let steps = parse_replay(file)?;

        info!(
            path = %path.display(),
            codes = steps.len(),
            speed = config.speed_multiplier,
            "loaded replay"
        );

        let name = format!("replay:{}", path.display());
        Ok(Self::from_steps(name, steps, config))
    }

    /// Build from already parsed steps
    pub fn from_steps(name: String, steps: Vec<ScriptedStep>, config: ReplayConfig) -> Self {
        Self {
            inner: ScriptedSource::new(name, steps).with_speed(config.speed_multiplier),
        }
    }

    /// Number of codes in the replay
    pub fn len(&self) -> usize {
        self.inner.steps().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.steps().is_empty()
    }
}

impl CodeSource for ReplaySource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn listen(&self, callback: CodeCallback) {
        self.inner.listen(callback);
    }

    fn stop(&self) {
        self.inner.stop();
    }

    fn is_listening(&self) -> bool {
        self.inner.is_listening()
    }
}

/// Parse replay text into steps
pub fn parse_replay(reader: impl Read) -> Result<Vec<ScriptedStep>> {
    let mut steps = Vec::new();

    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        steps.push(parse_line(idx + 1, line)?);
    }

    Ok(steps)
}

fn parse_line(line_no: usize, line: &str) -> Result<ScriptedStep> {
    let parse_err = |message: String| IngestionError::ReplayParse {
        line: line_no,
        message,
    };

    let (delay, code) = match line.strip_prefix('+') {
        Some(rest) => {
            let mut parts = rest.split_whitespace();
            let millis = parts.next().unwrap_or_default();
            let code = parts
                .next()
                .ok_or_else(|| parse_err("missing code after delay".to_string()))?;
            if parts.next().is_some() {
                return Err(parse_err("trailing input".to_string()));
            }
            let millis: u64 = millis
                .parse()
                .map_err(|e| parse_err(format!("invalid delay {millis:?}: {e}")))?;
            (Duration::from_millis(millis), code)
        }
        None => (Duration::ZERO, line),
    };

    let code: u32 = code
        .parse()
        .map_err(|e| parse_err(format!("invalid code {code:?}: {e}")))?;

    Ok(ScriptedStep::new(delay, code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_codes_delays_and_comments() {
        let text = "# burst\n4294961097\n\n+1500 4026531841\n  +0   7  \n";
        let steps = parse_replay(text.as_bytes()).unwrap();
        assert_eq!(
            steps,
            vec![
                ScriptedStep::new(Duration::ZERO, 4_294_961_097),
                ScriptedStep::new(Duration::from_millis(1500), 4_026_531_841),
                ScriptedStep::new(Duration::ZERO, 7),
            ]
        );
    }

    #[test]
    fn zero_code_is_passed_through() {
        // The sentinel is the decoder's concern, not the replay's.
        let steps = parse_replay("0\n".as_bytes()).unwrap();
        assert_eq!(steps[0].code, 0);
    }

    #[test]
    fn reports_line_number_on_error() {
        let err = parse_replay("1\n# ok\nnot-a-code\n".as_bytes()).unwrap_err();
        assert!(matches!(err, IngestionError::ReplayParse { line: 3, .. }));

        let err = parse_replay("+12\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("missing code"));

        let err = parse_replay("4294967296\n".as_bytes()).unwrap_err();
        assert!(matches!(err, IngestionError::ReplayParse { line: 1, .. }));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1\n+10 2").unwrap();
        let source = ReplaySource::load(file.path(), ReplayConfig::default()).unwrap();
        assert_eq!(source.len(), 2);
        assert!(source.name().starts_with("replay:"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = ReplaySource::load(Path::new("/nonexistent/codes.txt"), ReplayConfig::default());
        assert!(matches!(result, Err(IngestionError::Io(_))));
    }
}
