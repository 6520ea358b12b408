//! Global offset tuning against a rendered preview.
//!
//! The tuner only ever produces a single scalar. Per-line timings stay as
//! they are on disk; the renderer applies the offset as a uniform shift.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::error::{AlignError, Result};
use crate::interactive::read_command;
use crate::interactive::render::PreviewRenderer;
use crate::timing::read_any;

/// Seconds added or removed per earlier/later step.
pub const OFFSET_STEP: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunerState {
    Adjusting,
    Previewing,
    Locked,
    Aborted,
}

impl TunerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TunerState::Locked | TunerState::Aborted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunerCommand {
    Earlier,
    Later,
    Preview,
    Lock,
    Abort,
}

impl TunerCommand {
    /// Parse a menu choice. Case-insensitive; `None` for anything unknown.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "1" | "e" | "earlier" => Some(Self::Earlier),
            "2" | "l" | "later" => Some(Self::Later),
            "3" | "p" | "preview" => Some(Self::Preview),
            "4" | "lock" => Some(Self::Lock),
            "5" | "q" | "quit" | "abort" => Some(Self::Abort),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TunerOutcome {
    Locked(f64),
    Aborted,
}

pub struct OffsetTuner<P> {
    slug: String,
    offset: f64,
    state: TunerState,
    renderer: P,
}

impl<P: PreviewRenderer> OffsetTuner<P> {
    pub fn new(slug: &str, offset: f64, renderer: P) -> Self {
        Self {
            slug: slug.to_string(),
            offset,
            state: TunerState::Adjusting,
            renderer,
        }
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Apply one command and return the resulting state. Terminal states
    /// ignore further commands.
    pub fn apply(&mut self, command: TunerCommand) -> TunerState {
        if self.state.is_terminal() {
            return self.state;
        }
        match command {
            TunerCommand::Earlier => self.offset -= OFFSET_STEP,
            TunerCommand::Later => self.offset += OFFSET_STEP,
            TunerCommand::Preview => {
                self.state = TunerState::Previewing;
                match self.renderer.render(&self.slug, self.offset) {
                    Ok(()) => log::info!("Preview rendered at {:+.2}s", self.offset),
                    Err(e) => log::warn!("Preview failed: {:#}", e),
                }
                self.state = TunerState::Adjusting;
            }
            TunerCommand::Lock => self.state = TunerState::Locked,
            TunerCommand::Abort => self.state = TunerState::Aborted,
        }
        self.state
    }

    fn menu<W: Write>(&self, output: &mut W) -> std::io::Result<()> {
        writeln!(output)?;
        writeln!(output, "Slug: {}", self.slug)?;
        writeln!(output, "Current offset: {:+.2}s", self.offset)?;
        writeln!(output, "[1] Earlier (-{:.2}s)", OFFSET_STEP)?;
        writeln!(output, "[2] Later   (+{:.2}s)", OFFSET_STEP)?;
        writeln!(output, "[3] Preview")?;
        writeln!(output, "[4] Lock offset")?;
        writeln!(output, "[5] Abort")?;
        write!(output, "> ")?;
        output.flush()
    }

    /// Drive the state machine from `input` until it locks or aborts.
    /// End of input counts as an abort.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> Result<TunerOutcome> {
        while !self.state.is_terminal() {
            self.menu(&mut output)
                .map_err(|e| AlignError::io("writing tuner menu", e))?;
            let command = match read_command(&mut input)? {
                None => TunerCommand::Abort,
                Some(choice) => match TunerCommand::parse(&choice) {
                    Some(c) => c,
                    None => {
                        writeln!(output, "Invalid input: {:?}", choice)
                            .map_err(|e| AlignError::io("writing tuner menu", e))?;
                        continue;
                    }
                },
            };
            self.apply(command);
        }
        Ok(match self.state {
            TunerState::Locked => TunerOutcome::Locked(self.offset),
            _ => TunerOutcome::Aborted,
        })
    }
}

/// Everything a tuning session needs besides the operator and renderer.
#[derive(Debug, Clone)]
pub struct TuneRequest {
    pub slug: String,
    pub base_offset: f64,
    pub audio_path: PathBuf,
    pub timings_path: PathBuf,
}

impl TuneRequest {
    /// `<timings_dir>/<slug>.offset`
    pub fn offset_path(&self) -> PathBuf {
        let dir = self.timings_path.parent().unwrap_or_else(|| Path::new("."));
        dir.join(format!("{}.offset", self.slug))
    }
}

/// Previously locked offset, if a readable one exists.
pub fn read_offset_file(path: &Path) -> Option<f64> {
    let text = std::fs::read_to_string(path).ok()?;
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            log::warn!("Ignoring unreadable offset file {}", path.display());
            None
        }
    }
}

pub fn write_offset_file(path: &Path, offset: f64) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| AlignError::io(format!("creating {}", parent.display()), e))?;
    }
    std::fs::write(path, format!("{:.2}\n", offset))
        .map_err(|e| AlignError::io(format!("writing {}", path.display()), e))
}

/// Check preconditions, run the tuner, and persist a locked offset.
///
/// Missing audio or timings fail before any prompt is shown. The timing
/// table is only read, never rewritten.
pub fn tune<P, R, W>(request: &TuneRequest, renderer: P, input: R, output: W) -> Result<TunerOutcome>
where
    P: PreviewRenderer,
    R: BufRead,
    W: Write,
{
    if !request.audio_path.is_file() {
        return Err(AlignError::MissingInput {
            what: "audio file",
            path: request.audio_path.clone(),
        });
    }
    if !request.timings_path.is_file() {
        return Err(AlignError::MissingInput {
            what: "timings table",
            path: request.timings_path.clone(),
        });
    }
    let segments = read_any(&request.timings_path, 0.0)?;
    if !segments.iter().any(|s| s.is_known()) {
        return Err(AlignError::EmptyInput {
            what: "timings table",
            path: request.timings_path.clone(),
        });
    }

    let offset_path = request.offset_path();
    let start = match read_offset_file(&offset_path) {
        Some(saved) => {
            log::info!("Resuming from saved offset {:+.2}s", saved);
            saved
        }
        None => request.base_offset,
    };
    log::info!(
        "Tuning {} ({} lines) from {:+.2}s",
        request.slug,
        segments.len(),
        start
    );

    let mut tuner = OffsetTuner::new(&request.slug, start, renderer);
    let outcome = tuner.run(input, output)?;
    match outcome {
        TunerOutcome::Locked(offset) => {
            write_offset_file(&offset_path, offset)?;
            log::info!("Locked {:+.2}s -> {}", offset, offset_path.display());
        }
        TunerOutcome::Aborted => log::warn!("Tuning aborted at {:+.2}s", tuner.offset()),
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Records every preview request; fails when told to.
    #[derive(Default)]
    struct ScriptedRenderer {
        calls: Vec<(String, f64)>,
        fail: bool,
    }

    impl PreviewRenderer for ScriptedRenderer {
        fn render(&mut self, slug: &str, offset: f64) -> anyhow::Result<()> {
            self.calls.push((slug.to_string(), offset));
            if self.fail {
                anyhow::bail!("renderer crashed");
            }
            Ok(())
        }
    }

    fn run_script(script: &str, base: f64) -> (TunerOutcome, ScriptedRenderer, String) {
        let mut out = Vec::new();
        let mut renderer = ScriptedRenderer::default();
        let outcome = OffsetTuner::new("song", base, &mut renderer)
            .run(Cursor::new(script.to_string()), &mut out)
            .unwrap();
        (outcome, renderer, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(TunerCommand::parse("1"), Some(TunerCommand::Earlier));
        assert_eq!(TunerCommand::parse("E"), Some(TunerCommand::Earlier));
        assert_eq!(TunerCommand::parse("later"), Some(TunerCommand::Later));
        assert_eq!(TunerCommand::parse(" p "), Some(TunerCommand::Preview));
        assert_eq!(TunerCommand::parse("4"), Some(TunerCommand::Lock));
        assert_eq!(TunerCommand::parse("continue"), None);
        assert_eq!(TunerCommand::parse("quit"), Some(TunerCommand::Abort));
        assert_eq!(TunerCommand::parse("6"), None);
        assert_eq!(TunerCommand::parse(""), None);
    }

    #[test]
    fn test_steps_then_lock() {
        let (outcome, renderer, _) = run_script("1\n1\n2\n4\n", -1.5);
        assert_eq!(outcome, TunerOutcome::Locked(-1.75));
        assert!(renderer.calls.is_empty());
    }

    #[test]
    fn test_preview_passes_current_offset() {
        let (outcome, renderer, _) = run_script("2\np\n2\n3\nlock\n", 0.0);
        assert_eq!(outcome, TunerOutcome::Locked(0.5));
        assert_eq!(
            renderer.calls,
            vec![("song".to_string(), 0.25), ("song".to_string(), 0.5)]
        );
    }

    #[test]
    fn test_preview_failure_returns_to_adjusting() {
        let mut tuner = OffsetTuner::new(
            "song",
            1.0,
            ScriptedRenderer {
                fail: true,
                ..Default::default()
            },
        );
        assert_eq!(tuner.apply(TunerCommand::Preview), TunerState::Adjusting);
        assert_eq!(tuner.apply(TunerCommand::Later), TunerState::Adjusting);
        assert!((tuner.offset() - 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_input_stays_adjusting() {
        let (outcome, _, prompts) = run_script("x\n\n2\n4\n", 0.0);
        assert_eq!(outcome, TunerOutcome::Locked(0.25));
        assert!(prompts.contains("Invalid input: \"x\""));
        assert!(prompts.contains("Current offset: +0.25s"));
    }

    #[test]
    fn test_abort_and_eof() {
        let (outcome, _, _) = run_script("1\n5\n4\n", 0.0);
        assert_eq!(outcome, TunerOutcome::Aborted);
        let (outcome, _, _) = run_script("1\n", 0.0);
        assert_eq!(outcome, TunerOutcome::Aborted);
    }

    #[test]
    fn test_terminal_state_ignores_commands() {
        let mut tuner = OffsetTuner::new("song", 0.0, ScriptedRenderer::default());
        assert_eq!(tuner.apply(TunerCommand::Lock), TunerState::Locked);
        assert_eq!(tuner.apply(TunerCommand::Later), TunerState::Locked);
        assert_eq!(tuner.offset(), 0.0);
    }

    fn fixture(dir: &Path) -> TuneRequest {
        let audio = dir.join("song.wav");
        let timings = dir.join("timings").join("song.csv");
        std::fs::create_dir_all(timings.parent().unwrap()).unwrap();
        std::fs::write(&audio, b"RIFF").unwrap();
        std::fs::write(
            &timings,
            "line_index,start_secs,end_secs,text\n0,1.000,2.000,a\n1,2.000,4.000,b\n",
        )
        .unwrap();
        TuneRequest {
            slug: "song".into(),
            base_offset: -1.5,
            audio_path: audio,
            timings_path: timings,
        }
    }

    #[test]
    fn test_tune_writes_offset_and_leaves_timings() {
        let dir = tempfile::tempdir().unwrap();
        let req = fixture(dir.path());
        let before = std::fs::read_to_string(&req.timings_path).unwrap();

        let outcome = tune(&req, ScriptedRenderer::default(), Cursor::new("2\n4\n"), Vec::new()).unwrap();
        assert_eq!(outcome, TunerOutcome::Locked(-1.25));
        assert_eq!(std::fs::read_to_string(req.offset_path()).unwrap(), "-1.25\n");
        assert_eq!(std::fs::read_to_string(&req.timings_path).unwrap(), before);

        // a second session resumes from the saved value
        let outcome = tune(&req, ScriptedRenderer::default(), Cursor::new("2\n4\n"), Vec::new()).unwrap();
        assert_eq!(outcome, TunerOutcome::Locked(-1.0));
    }

    #[test]
    fn test_tune_abort_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let req = fixture(dir.path());
        let outcome = tune(&req, ScriptedRenderer::default(), Cursor::new("q\n"), Vec::new()).unwrap();
        assert_eq!(outcome, TunerOutcome::Aborted);
        assert!(!req.offset_path().exists());
    }

    #[test]
    fn test_tune_missing_audio() {
        let dir = tempfile::tempdir().unwrap();
        let mut req = fixture(dir.path());
        req.audio_path = dir.path().join("nope.wav");
        let result = tune(&req, ScriptedRenderer::default(), Cursor::new("4\n"), Vec::new());
        assert!(matches!(result, Err(AlignError::MissingInput { what: "audio file", .. })));
    }

    #[test]
    fn test_tune_rejects_untimed_table() {
        let dir = tempfile::tempdir().unwrap();
        let req = fixture(dir.path());
        std::fs::write(&req.timings_path, "line_index,start_secs,end_secs,text\n0,,,a\n").unwrap();
        let result = tune(&req, ScriptedRenderer::default(), Cursor::new("4\n"), Vec::new());
        assert!(matches!(result, Err(AlignError::EmptyInput { .. })));
    }

    #[test]
    fn test_offset_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.offset");
        assert_eq!(read_offset_file(&path), None);
        write_offset_file(&path, 0.5).unwrap();
        assert_eq!(read_offset_file(&path), Some(0.5));
        std::fs::write(&path, "junk").unwrap();
        assert_eq!(read_offset_file(&path), None);
    }
}
