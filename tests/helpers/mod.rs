#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Stub engine output for a matching pair: well above the default threshold.
pub const MATCH_SCRIPT: &str = "#!/bin/sh\n\
echo \"Template extracted from reference\"\n\
echo \"Template extracted from candidate\"\n\
echo \"Voice score: 75\"\n\
echo \"Verification succeeded\"\n";

/// Stub engine output for a non-matching pair: below the default threshold.
pub const MISMATCH_SCRIPT: &str = "#!/bin/sh\n\
echo \"Voice score: 12\"\n\
echo \"Verification failed\"\n";

/// Stub engine that prints nothing a score pattern could match.
pub const GARBAGE_SCRIPT: &str = "#!/bin/sh\n\
echo \"unexpected diagnostic output\"\n";

/// Stub engine that fails the way an unlicensed SDK binary does.
pub const LICENSE_FAILURE_SCRIPT: &str = "#!/bin/sh\n\
echo \"initializing\"\n\
echo \"license check failed\" 1>&2\n\
exit 3\n";

/// Stub engine that outlives any short timeout budget. `exec` keeps the
/// pipe in the killed process itself so partial output stays readable.
pub const SLEEPY_SCRIPT: &str = "#!/bin/sh\n\
echo \"Voice score pending\"\n\
exec sleep 30\n";

pub fn ffmpeg_available() -> bool {
    tool_available("ffmpeg")
}

pub fn ffprobe_available() -> bool {
    tool_available("ffprobe")
}

fn tool_available(tool: &str) -> bool {
    Command::new(tool)
        .args(["-hide_banner", "-version"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// True when the test environment overrides the native binary path, which
/// would bypass the fake SDK trees these tests build.
pub fn native_bin_overridden() -> bool {
    std::env::var("VERIVOICE_NATIVE_BIN").is_ok()
}

/// Build a minimal SDK tree that discovery accepts and return its root.
pub fn fake_sdk_root(dir: &Path) -> PathBuf {
    let root = dir.join("Neurotec_Biometric_13_1_SDK");
    std::fs::create_dir_all(root.join("Tutorials").join("Biometrics")).expect("create sdk tree");
    std::fs::create_dir_all(root.join("Lib").join("Linux_x86_64")).expect("create lib dir");
    root
}

/// Install an executable scoring stub at the tree's tutorial binary path.
pub fn install_native_stub(sdk_root: &Path, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let binary = sdk_root
        .join("Tutorials")
        .join("Biometrics")
        .join("CPP")
        .join("VerifyVoiceCPP")
        .join("VerifyVoiceCPP");
    std::fs::create_dir_all(binary.parent().expect("binary parent")).expect("create binary dir");
    std::fs::write(&binary, script).expect("write stub");

    let mut perms = std::fs::metadata(&binary)
        .expect("stub metadata")
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&binary, perms).expect("chmod stub");
    binary
}

/// Generate a synthetic WAV file (16-bit PCM) with a sine tone.
pub fn generate_test_wav(
    dir: &Path,
    name: &str,
    duration_secs: f32,
    frequency_hz: f32,
    sample_rate: u32,
    channels: u16,
) -> PathBuf {
    let frames = (sample_rate as f32 * duration_secs) as usize;
    let mut samples = Vec::with_capacity(frames * channels as usize);
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let value = (2.0 * std::f32::consts::PI * frequency_hz * t).sin();
        let sample = (value * 0.6 * 32767.0) as i16;
        for _ in 0..channels {
            samples.push(sample);
        }
    }

    let path = dir.join(name);
    write_wav_file(&path, &samples, sample_rate, channels);
    path
}

/// Generate a mono 16 kHz tone, the shape the scoring engine expects.
pub fn generate_engine_ready_wav(dir: &Path, name: &str, frequency_hz: f32) -> PathBuf {
    generate_test_wav(dir, name, 4.0, frequency_hz, 16_000, 1)
}

fn write_wav_file(path: &Path, samples: &[i16], sample_rate: u32, channels: u16) {
    use std::io::Write;
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;
    let byte_rate = sample_rate * channels as u32 * 2;
    let block_align = channels * 2;

    let mut file = std::fs::File::create(path).expect("failed to create WAV file");
    // RIFF header
    file.write_all(b"RIFF").unwrap();
    file.write_all(&file_size.to_le_bytes()).unwrap();
    file.write_all(b"WAVE").unwrap();
    // fmt chunk
    file.write_all(b"fmt ").unwrap();
    file.write_all(&16u32.to_le_bytes()).unwrap(); // chunk size
    file.write_all(&1u16.to_le_bytes()).unwrap(); // PCM format
    file.write_all(&channels.to_le_bytes()).unwrap();
    file.write_all(&sample_rate.to_le_bytes()).unwrap();
    file.write_all(&byte_rate.to_le_bytes()).unwrap();
    file.write_all(&block_align.to_le_bytes()).unwrap();
    file.write_all(&16u16.to_le_bytes()).unwrap(); // bits per sample
    // data chunk
    file.write_all(b"data").unwrap();
    file.write_all(&data_size.to_le_bytes()).unwrap();
    for sample in samples {
        file.write_all(&sample.to_le_bytes()).unwrap();
    }
}
