use std::{env, ffi::OsString, path::PathBuf};

use pretty_assertions::assert_eq;

struct Command {
    bin: PathBuf,
    args: Vec<OsString>,
}

// Adapted from
// https://github.com/rust-lang/cargo/blob/485670b3983b52289a2f353d589c57fae2f60f82/tests/testsuite/support/mod.rs#L507
fn target_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .map(|mut path| {
            path.pop();
            if path.ends_with("deps") {
                path.pop();
            }
            path
        })
        .unwrap()
}

impl Command {
    fn cargo_bin(name: &str) -> Command {
        let bin = env::var_os(format!("CARGO_BIN_EXE_{name}"))
            .map(|p| p.into())
            .unwrap_or_else(|| target_dir().join(format!("{name}{}", env::consts::EXE_SUFFIX)));

        Command {
            bin,
            args: Vec::new(),
        }
    }

    fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn run(self) -> CommandResult {
        let output = std::process::Command::new(self.bin)
            .args(&self.args)
            .env_remove("RUST_LOG")
            .output()
            .expect("failed to execute command");

        CommandResult {
            status: output.status,
            stdout: String::from_utf8(output.stdout).expect("stdout is not valid UTF-8"),
            stderr: String::from_utf8(output.stderr).expect("stderr is not valid UTF-8"),
        }
    }
}

struct CommandResult {
    status: std::process::ExitStatus,
    stdout: String,
    stderr: String,
}

#[test]
fn blob_needs_an_output_file() {
    let result = Command::cargo_bin("target-gen")
        .arg("blob")
        .arg("--variant")
        .arg("xd")
        .run();

    assert!(!result.status.success());
    assert!(result
        .stderr
        .contains("the following required arguments were not provided:"));
}

#[test]
fn unknown_variant_is_rejected() {
    let result = Command::cargo_bin("target-gen")
        .arg("export")
        .arg("--variant")
        .arg("f4")
        .run();

    assert!(!result.status.success());
    assert!(result.stderr.contains("Unknown device variant 'f4'"));
}

#[test]
fn export_prints_the_flash_properties() {
    let result = Command::cargo_bin("target-gen")
        .arg("export")
        .arg("--variant")
        .arg("xd")
        .run();

    assert!(result.status.success(), "{}", result.stderr);
    // The name keeps its trailing space, so YAML quotes it.
    assert!(result.stdout.contains("GD32F30x Extra-density FMC "));
    assert!(result.stdout.contains("dual_bank: true"));
    assert!(result.stdout.contains("0x8000000"));
    assert!(result.stdout.contains("0x1000"));
}

#[test]
fn export_writes_a_file() {
    let temp = tempfile::TempDir::new().unwrap();
    let output = temp.path().join("hd.yaml");

    let result = Command::cargo_bin("target-gen")
        .arg("export")
        .arg(&output)
        .run();

    assert!(result.status.success(), "{}", result.stderr);
    assert_eq!(result.stdout, "");

    let yaml = std::fs::read_to_string(&output).unwrap();
    assert!(yaml.contains("variant: hd"));
    assert!(yaml.contains("dual_bank: false"));
}

#[test]
fn blob_decodes_to_the_same_variant() {
    let temp = tempfile::TempDir::new().unwrap();
    let blob = temp.path().join("cl.bin");

    let result = Command::cargo_bin("target-gen")
        .arg("blob")
        .arg("--variant")
        .arg("cl")
        .arg(&blob)
        .run();
    assert!(result.status.success(), "{}", result.stderr);

    // Header, two sector groups and the sentinel.
    assert_eq!(std::fs::metadata(&blob).unwrap().len(), 160 + 3 * 8);

    let result = Command::cargo_bin("target-gen")
        .arg("decode")
        .arg(&blob)
        .run();

    assert!(result.status.success(), "{}", result.stderr);
    assert!(result.stdout.contains("name: GD32F30x Connectivity line FMC"));
    assert!(result.stdout.contains("variant: cl"));
}

#[test]
fn decode_rejects_a_truncated_blob() {
    let temp = tempfile::TempDir::new().unwrap();
    let blob = temp.path().join("short.bin");
    std::fs::write(&blob, [0u8; 64]).unwrap();

    let result = Command::cargo_bin("target-gen")
        .arg("decode")
        .arg(&blob)
        .run();

    assert!(!result.status.success());
    assert!(result.stderr.contains("Failed to decode the description"));
}

#[test]
fn decode_rejects_an_offset_past_the_end() {
    let temp = tempfile::TempDir::new().unwrap();
    let blob = temp.path().join("empty.bin");
    std::fs::write(&blob, [0u8; 4]).unwrap();

    let result = Command::cargo_bin("target-gen")
        .arg("decode")
        .arg("--offset")
        .arg("0x10")
        .arg(&blob)
        .run();

    assert!(!result.status.success());
    assert!(result.stderr.contains("lies beyond the end"));
}

#[test]
fn dry_run_passes_on_every_variant() {
    for variant in ["hd", "xd", "cl", "option-bytes"] {
        let result = Command::cargo_bin("target-gen")
            .arg("test")
            .arg("--variant")
            .arg(variant)
            .arg("--busy-polls")
            .arg("2")
            .run();

        assert!(result.status.success(), "{variant}: {}", result.stderr);
        assert!(result.stdout.contains("Passed"), "{variant}");
    }
}

#[test]
fn dry_run_crosses_the_bank_boundary() {
    let result = Command::cargo_bin("target-gen")
        .arg("test")
        .arg("--variant")
        .arg("xd")
        .arg("--address")
        .arg("0x0807F800")
        .arg("--length")
        .arg("0x1000")
        .arg("--hardware-watchdog")
        .run();

    assert!(result.status.success(), "{}", result.stderr);
    assert!(result.stdout.contains("Passed"));
}

#[test]
fn dry_run_inside_bank_one() {
    let result = Command::cargo_bin("target-gen")
        .arg("test")
        .arg("--variant")
        .arg("xd")
        .arg("--address")
        .arg("0x08080000")
        .arg("--length")
        .arg("0x400")
        .run();

    assert!(result.status.success(), "{}", result.stderr);
    assert!(result.stdout.contains("Passed"));
}

#[test]
fn dry_run_outside_the_device_fails() {
    let result = Command::cargo_bin("target-gen")
        .arg("test")
        .arg("--variant")
        .arg("hd")
        .arg("--address")
        .arg("0x08080000")
        .run();

    assert!(!result.status.success());
    assert!(result.stderr.contains("is not part of the hd flash"));
}
