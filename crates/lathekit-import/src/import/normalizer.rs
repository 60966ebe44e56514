//! Out-of-process DXF normalization.
//!
//! Runs a normalizer script under an external interpreter:
//!
//! ```text
//! <interpreter> <script> <input.dxf> <output.json> --approx-segs <N> --explode-inserts --verbose
//! ```
//!
//! and decodes the JSON records it writes. Every failure here is recoverable:
//! a missing script, a missing interpreter, a timeout, or an absent artifact
//! all come back as errors the resolver swallows before trying the next tier.
//! A log combining the adapter's own notes with the script's stdout and
//! stderr is left next to the JSON for troubleshooting.

use super::decoder::{Diagnostics, GeometryDecoder, ImportTier};
use lathekit_core::{CurveTessellator, GeometryModel, ImportError, Point2, Polyline};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Environment variable that points straight at a normalizer script.
pub const NORMALIZER_ENV_VAR: &str = "LATHEKIT_NORMALIZER";

/// How far up from the executable's directory the script is searched for.
const MAX_ANCESTOR_LEVELS: usize = 8;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Extra time granted to the pipe readers once the script has exited or been killed.
const PIPE_GRACE: Duration = Duration::from_millis(500);

/// Normalizer settings
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizerConfig {
    /// Variable consulted first for an explicit script path
    pub env_var: String,
    /// Script path from configuration, consulted after the variable
    pub script_override: Option<PathBuf>,
    /// Script location relative to the program directory (or an ancestor)
    pub relative_script: PathBuf,
    /// Interpreter names tried in order
    pub interpreters: Vec<String>,
    pub timeout: Duration,
    /// Value passed as `--approx-segs`, also used for circle/arc records
    pub segments: usize,
    pub explode_inserts: bool,
    /// Where the JSON and log artifacts are written
    pub artifact_dir: PathBuf,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            env_var: NORMALIZER_ENV_VAR.to_string(),
            script_override: None,
            relative_script: PathBuf::from("tools/python/ezdxf_normalize.py"),
            interpreters: vec!["python3".to_string(), "python".to_string(), "py".to_string()],
            timeout: Duration::from_secs(120),
            segments: lathekit_core::DEFAULT_SEGMENTS,
            explode_inserts: true,
            artifact_dir: std::env::temp_dir(),
        }
    }
}

/// Captured result of one normalizer run
#[derive(Debug)]
struct RunOutput {
    status: Option<ExitStatus>,
    stdout: String,
    stderr: String,
    timed_out: bool,
}

/// Subprocess-backed decoder tier
#[derive(Debug, Clone, Default)]
pub struct ExternalNormalizerAdapter {
    config: NormalizerConfig,
}

impl ExternalNormalizerAdapter {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Locate the script: environment variable, configured path, the
    /// relative path under the program directory or any ancestor, then the
    /// current working directory.
    pub fn locate_script(&self) -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(&self.config.env_var).map(PathBuf::from) {
            if path.is_file() {
                return Some(path);
            }
            warn!(
                "{} points at {}, which is not a file",
                self.config.env_var,
                path.display()
            );
        }

        if let Some(path) = self.config.script_override.as_ref() {
            if path.is_file() {
                return Some(path.clone());
            }
        }

        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf));
        if let Some(dir) = exe_dir {
            for ancestor in dir.ancestors().take(MAX_ANCESTOR_LEVELS) {
                let candidate = ancestor.join(&self.config.relative_script);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }

        std::env::current_dir()
            .ok()
            .map(|cwd| cwd.join(&self.config.relative_script))
            .filter(|candidate| candidate.is_file())
    }

    /// First interpreter that can be launched at all.
    pub fn locate_interpreter(&self) -> Option<String> {
        self.config
            .interpreters
            .iter()
            .find(|name| {
                Command::new(name.as_str())
                    .arg("--version")
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .is_ok()
            })
            .cloned()
    }

    fn run(
        &self,
        interpreter: &str,
        script: &Path,
        input: &Path,
        output: &Path,
    ) -> Result<RunOutput, ImportError> {
        let mut command = Command::new(interpreter);
        command
            .arg(script)
            .arg(input)
            .arg(output)
            .arg("--approx-segs")
            .arg(self.config.segments.to_string());
        if self.config.explode_inserts {
            command.arg("--explode-inserts");
        }
        command
            .arg("--verbose")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| ImportError::SubprocessUnavailable {
            reason: format!("failed to launch {}: {}", interpreter, e),
        })?;

        // Drain both pipes concurrently so a chatty script cannot fill one and stall.
        let stdout_reader = child.stdout.take().map(drain);
        let stderr_reader = child.stderr.take().map(drain);

        let deadline = Instant::now() + self.config.timeout;
        let mut timed_out = false;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break Some(status);
            }
            if Instant::now() >= deadline {
                warn!(
                    "Normalizer exceeded {:?}, killing process {}",
                    self.config.timeout,
                    child.id()
                );
                timed_out = true;
                let _ = child.kill();
                break child.wait().ok();
            }
            thread::sleep(POLL_INTERVAL);
        };

        // Processes the script spawned may still hold the pipes open.
        let pipe_deadline = deadline.max(Instant::now() + PIPE_GRACE);
        let stdout = collect(stdout_reader, pipe_deadline, "stdout");
        let stderr = collect(stderr_reader, pipe_deadline, "stderr");

        Ok(RunOutput {
            status,
            stdout,
            stderr,
            timed_out,
        })
    }

    fn normalize(
        &self,
        input: &Path,
        diagnostics: &mut Diagnostics,
        log: &mut Vec<String>,
    ) -> Result<GeometryModel, ImportError> {
        let script = self.locate_script().ok_or_else(|| {
            ImportError::SubprocessUnavailable {
                reason: format!(
                    "normalizer script {} not found",
                    self.config.relative_script.display()
                ),
            }
        })?;
        log.push(format!("script: {}", script.display()));

        let interpreter =
            self.locate_interpreter()
                .ok_or_else(|| ImportError::SubprocessUnavailable {
                    reason: format!(
                        "no interpreter found (tried {})",
                        self.config.interpreters.join(", ")
                    ),
                })?;
        log.push(format!("interpreter: {}", interpreter));

        let json_path = self
            .config
            .artifact_dir
            .join(format!("lathekit-normalize-{}.json", Uuid::new_v4()));
        log.push(format!("output: {}", json_path.display()));

        let run = self.run(&interpreter, &script, input, &json_path)?;
        log.push(format!(
            "exit: {}{}",
            run.status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            if run.timed_out { " (timed out)" } else { "" }
        ));
        log.push("--- stdout ---".to_string());
        log.push(run.stdout);
        log.push("--- stderr ---".to_string());
        log.push(run.stderr);

        if !json_path.is_file() {
            return Err(ImportError::MalformedArtifact {
                reason: format!("{} was not written", json_path.display()),
            });
        }
        diagnostics.normalizer_json = Some(json_path.clone());

        let content = std::fs::read_to_string(&json_path)?;
        let tessellator = CurveTessellator::new(self.config.segments);
        decode_normalizer_json(&content, &tessellator)
    }

    fn write_log(&self, log: &[String]) -> Option<PathBuf> {
        let log_path = self
            .config
            .artifact_dir
            .join(format!("lathekit-normalize-{}.log", Uuid::new_v4()));
        match std::fs::write(&log_path, log.join("\n")) {
            Ok(()) => Some(log_path),
            Err(e) => {
                warn!("Failed to write normalizer log {}: {}", log_path.display(), e);
                None
            }
        }
    }
}

impl GeometryDecoder for ExternalNormalizerAdapter {
    fn tier(&self) -> ImportTier {
        ImportTier::Normalizer
    }

    fn decode(
        &self,
        path: &Path,
        diagnostics: &mut Diagnostics,
    ) -> Result<GeometryModel, ImportError> {
        let mut log = vec![format!("input: {}", path.display())];
        let result = self.normalize(path, diagnostics, &mut log);
        if let Err(e) = &result {
            log.push(format!("error: {}", e));
        }
        diagnostics.normalizer_log = self.write_log(&log);

        if let Ok(model) = &result {
            info!(
                "Normalizer decoded {} polylines from {}",
                model.polyline_count(),
                path.display()
            );
        }
        result
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Wait for a pipe reader until `deadline`. A reader still blocked after that
/// is abandoned and its output dropped.
fn collect(
    reader: Option<mpsc::Receiver<String>>,
    deadline: Instant,
    stream: &str,
) -> String {
    let Some(rx) = reader else {
        return String::new();
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(output) => output,
        Err(_) => {
            warn!("Normalizer {} still open after exit, abandoning it", stream);
            format!("<{} not closed by the normalizer>", stream)
        }
    }
}

/// Decode the normalizer's JSON: an array of `polyline`, `circle`, and `arc`
/// records. Malformed or unknown records are skipped one by one.
pub fn decode_normalizer_json(
    content: &str,
    tessellator: &CurveTessellator,
) -> Result<GeometryModel, ImportError> {
    if content.trim().is_empty() {
        return Err(ImportError::MalformedArtifact {
            reason: "normalizer output is empty".to_string(),
        });
    }
    let value: Value =
        serde_json::from_str(content).map_err(|e| ImportError::MalformedArtifact {
            reason: e.to_string(),
        })?;
    let records = value
        .as_array()
        .ok_or_else(|| ImportError::MalformedArtifact {
            reason: "expected a JSON array of records".to_string(),
        })?;

    let mut model = GeometryModel::new();
    for (index, record) in records.iter().enumerate() {
        match decode_record(record, tessellator) {
            Some(polyline) => model.push(polyline),
            None => debug!("Skipping normalizer record {}: {}", index, record),
        }
    }
    Ok(model)
}

fn decode_record(record: &Value, tessellator: &CurveTessellator) -> Option<Polyline> {
    let kind = record.get("type")?.as_str()?.to_ascii_lowercase();
    match kind.as_str() {
        "polyline" => {
            let points = record
                .get("points")?
                .as_array()?
                .iter()
                .map(point)
                .collect::<Option<Vec<Point2>>>()?;
            Some(Polyline::new(points))
        }
        "circle" => {
            let center = Point2::new(field(record, "cx")?, field(record, "cy")?);
            let radius = positive(field(record, "r")?)?;
            Some(tessellator.circle(center, radius))
        }
        "arc" => {
            let center = Point2::new(field(record, "cx")?, field(record, "cy")?);
            let radius = positive(field(record, "r")?)?;
            Some(tessellator.arc(
                center,
                radius,
                field(record, "start")?,
                field(record, "end")?,
            ))
        }
        _ => None,
    }
}

fn point(value: &Value) -> Option<Point2> {
    let coords = value.as_array()?;
    if coords.len() < 2 {
        return None;
    }
    Some(Point2::new(number(&coords[0])?, number(&coords[1])?))
}

fn field(record: &Value, name: &str) -> Option<f64> {
    number(record.get(name)?)
}

/// A finite number, given either as a JSON number or as a numeric string.
fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn positive(r: f64) -> Option<f64> {
    (r > 0.0).then_some(r)
}
