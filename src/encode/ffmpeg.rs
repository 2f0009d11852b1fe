use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use anyhow::Context as _;

use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{TracklayError, TracklayResult};
use crate::render::backend::FrameRgba;
use crate::timeline::Tick;

/// Extra `ffmpeg` arguments loaded from a profiles file.
///
/// `input` args are spliced before `-i pipe:0`, `output` args replace the
/// default codec block. Mirrors the `ffmpeg-profiles.json` convention:
///
/// ```json
/// { "nvenc": { "input": [], "output": ["-c:v", "h264_nvenc", "-rc:v", "vbr"] } }
/// ```
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct EncodeProfile {
    /// Arguments applied to the rawvideo input.
    #[serde(default)]
    pub input: Vec<String>,
    /// Arguments applied to the encoded output.
    #[serde(default)]
    pub output: Vec<String>,
}

impl EncodeProfile {
    /// Load a named profile from a JSON profiles file.
    pub fn load(path: &Path, name: &str) -> TracklayResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read profiles file '{}'", path.display()))?;
        let mut profiles: BTreeMap<String, EncodeProfile> =
            serde_json::from_str(&text).map_err(|e| {
                TracklayError::validation(format!(
                    "profiles file '{}' is not valid: {e}",
                    path.display()
                ))
            })?;
        profiles.remove(name).ok_or_else(|| {
            TracklayError::validation(format!(
                "profile '{name}' not found in '{}'",
                path.display()
            ))
        })
    }
}

/// Options for [`FfmpegSink`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output file path.
    pub out_path: PathBuf,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
    /// Optional encode profile overriding the default codec arguments.
    pub profile: Option<EncodeProfile>,
}

impl FfmpegSinkOpts {
    /// Create options for outputting to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            profile: None,
        }
    }
}

/// Sink that spawns the system `ffmpeg` and streams raw RGBA8 frames to its
/// stdin.
///
/// The stdin write is a plain blocking `write_all`: when ffmpeg falls behind,
/// the OS pipe buffer fills and the producer blocks, which is the pipeline's
/// backpressure. A dead ffmpeg surfaces as a broken pipe, which `submit`
/// converts into [`TracklayError::SinkClosed`] with the child's exit detail.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
    frames_written: u64,
    closed: bool,
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            cfg: None,
            last_idx: None,
            frames_written: 0,
            closed: false,
        }
    }

    /// Frames accepted by ffmpeg so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn reap(&mut self) -> (Option<std::process::ExitStatus>, Vec<u8>) {
        drop(self.stdin.take());
        // Dropping stdin first means ffmpeg sees EOF, so wait() terminates.
        let status = self.child.take().and_then(|mut child| child.wait().ok());
        let stderr = match self.stderr_drain.take() {
            Some(handle) => handle.join().ok().and_then(Result::ok).unwrap_or_default(),
            None => Vec::new(),
        };
        (status, stderr)
    }

    fn fail_closed(&mut self, io_detail: &str) -> TracklayError {
        self.closed = true;
        let (status, stderr) = self.reap();
        let stderr = String::from_utf8_lossy(&stderr);
        let detail = match status {
            Some(st) => format!("ffmpeg exited with {st}: {} ({io_detail})", stderr.trim()),
            None => format!("{io_detail}: {}", stderr.trim()),
        };
        TracklayError::sink_closed(self.frames_written, detail)
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> TracklayResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(TracklayError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(TracklayError::validation(
                "ffmpeg sink width/height must be even (required for yuv420p mp4 output)",
            ));
        }

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(TracklayError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(TracklayError::validation(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.args(build_args(&cfg, &self.opts));
        cmd.arg(&self.opts.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            TracklayError::validation(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TracklayError::pipeline("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| TracklayError::pipeline("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        tracing::debug!(out = %self.opts.out_path.display(), "ffmpeg sink started");
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        self.frames_written = 0;
        self.closed = false;
        Ok(())
    }

    fn submit(&mut self, tick: Tick, frame: &FrameRgba) -> TracklayResult<()> {
        if self.closed {
            return Err(TracklayError::sink_closed(
                self.frames_written,
                "sink already failed",
            ));
        }
        let cfg = self
            .cfg
            .ok_or_else(|| TracklayError::pipeline("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && tick.index.0 <= last.0
        {
            return Err(TracklayError::pipeline(
                "ffmpeg sink received out-of-order tick index",
            ));
        }

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(TracklayError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        let expected = (cfg.width as usize) * (cfg.height as usize) * 4;
        if frame.data.len() != expected {
            return Err(TracklayError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(TracklayError::pipeline("ffmpeg sink is already finalized"));
        };

        use std::io::Write as _;
        if let Err(e) = stdin.write_all(&frame.data) {
            return Err(self.fail_closed(&format!("failed to write frame to ffmpeg stdin: {e}")));
        }

        self.last_idx = Some(tick.index);
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> TracklayResult<()> {
        if self.child.is_none() {
            return Err(TracklayError::pipeline("ffmpeg sink not started"));
        }
        let (status, stderr) = self.reap();
        self.cfg = None;

        match status {
            Some(st) if st.success() => Ok(()),
            Some(st) => {
                let stderr = String::from_utf8_lossy(&stderr);
                Err(TracklayError::sink_closed(
                    self.frames_written,
                    format!("ffmpeg exited with {st}: {}", stderr.trim()),
                ))
            }
            None => Err(TracklayError::sink_closed(
                self.frames_written,
                "failed to wait for ffmpeg to finish",
            )),
        }
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            // Discard whatever ffmpeg had in flight; reap so nothing orphans.
            let _ = child.kill();
            let _ = child.wait();
            tracing::debug!("ffmpeg sink aborted, child terminated");
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
        self.closed = true;
        self.cfg = None;
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        // A sink dropped without finish() still must not leak the child.
        if self.child.is_some() {
            self.abort();
        }
    }
}

fn build_args(cfg: &SinkConfig, opts: &FfmpegSinkOpts) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    args.push(if opts.overwrite { "-y" } else { "-n" }.to_owned());
    args.extend(
        [
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
        ]
        .map(str::to_owned),
    );
    args.push(format!("{}x{}", cfg.width, cfg.height));
    // Rational input rate for rawvideo must precede -i.
    args.push("-r".to_owned());
    args.push(format!("{}/{}", cfg.fps.num, cfg.fps.den));
    if let Some(profile) = &opts.profile {
        args.extend(profile.input.iter().cloned());
    }
    args.push("-i".to_owned());
    args.push("pipe:0".to_owned());
    args.push("-an".to_owned());

    match &opts.profile {
        Some(profile) if !profile.output.is_empty() => {
            args.extend(profile.output.iter().cloned());
        }
        _ => {
            // h264 + yuv420p for broad compatibility.
            args.extend(
                [
                    "-c:v",
                    "libx264",
                    "-pix_fmt",
                    "yuv420p",
                    "-movflags",
                    "+faststart",
                ]
                .map(str::to_owned),
            );
        }
    }
    args
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> TracklayResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Fps;

    fn cfg() -> SinkConfig {
        SinkConfig {
            width: 640,
            height: 480,
            fps: Fps::new(30_000, 1001).unwrap(),
        }
    }

    #[test]
    fn default_args_target_h264_yuv420p() {
        let args = build_args(&cfg(), &FfmpegSinkOpts::new("out.mp4"));
        let joined = args.join(" ");
        assert!(joined.starts_with("-y -loglevel error -f rawvideo -pix_fmt rgba -s 640x480"));
        assert!(joined.contains("-r 30000/1001 -i pipe:0 -an"));
        assert!(joined.contains("-c:v libx264 -pix_fmt yuv420p -movflags +faststart"));
    }

    #[test]
    fn profile_args_replace_the_codec_block() {
        let opts = FfmpegSinkOpts {
            out_path: "out.mp4".into(),
            overwrite: false,
            profile: Some(EncodeProfile {
                input: vec!["-hwaccel".into(), "cuda".into()],
                output: vec!["-c:v".into(), "h264_nvenc".into()],
            }),
        };
        let args = build_args(&cfg(), &opts);
        let joined = args.join(" ");
        assert!(joined.starts_with("-n "));
        assert!(joined.contains("-hwaccel cuda -i pipe:0"));
        assert!(joined.contains("-c:v h264_nvenc"));
        assert!(!joined.contains("libx264"));
    }

    #[test]
    fn profiles_load_by_name() {
        let dir = std::env::temp_dir().join(format!("tracklay_profiles_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("profiles.json");
        std::fs::write(
            &path,
            r#"{"slow": {"output": ["-c:v", "libx264", "-preset", "veryslow"]}}"#,
        )
        .unwrap();

        let p = EncodeProfile::load(&path, "slow").unwrap();
        assert_eq!(p.output[3], "veryslow");
        assert!(p.input.is_empty());
        assert!(EncodeProfile::load(&path, "missing").is_err());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn begin_rejects_odd_dimensions() {
        let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("out.mp4"));
        let bad = SinkConfig {
            width: 641,
            height: 480,
            fps: Fps::new(30, 1).unwrap(),
        };
        assert!(sink.begin(bad).is_err());
    }
}
