use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

fn tapec(args: &[&str], stdin: &[u8]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_tapec"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(stdin).unwrap();
    child.wait_with_output().unwrap()
}

fn source_file(dir: &Path, name: &str, source: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, source).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn unclosed_loop_reports_parsing_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = source_file(dir.path(), "open.b", "+[");
    let output = tapec(&[&input], b"");
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(String::from_utf8_lossy(&output.stderr), "Parsing Error: Loop was not ended!\n");
    assert!(!dir.path().join("open").exists());
}

#[test]
fn stray_loop_end_reports_parsing_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = source_file(dir.path(), "close.b", "]");
    let output = tapec(&["--emit", "obj", &input], b"");
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(String::from_utf8_lossy(&output.stderr), "Parsing Error: Loop was not started!\n");
    assert!(!dir.path().join("close.o").exists());
}

#[test]
fn emit_ir_prints_the_listing() {
    let dir = tempfile::tempdir().unwrap();
    let input = source_file(dir.path(), "inc.b", "++");
    let output = tapec(&["--emit", "ir", &input], b"");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("module \"inc\"\n"));
    assert!(stdout.contains("  cell.add 2\n"));
}

#[test]
fn emit_obj_writes_to_the_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = source_file(dir.path(), "out.b", "+.");
    let target = dir.path().join("custom.o");
    let target_arg = target.to_string_lossy().into_owned();
    let output = tapec(&["--emit", "obj", "-o", &target_arg, &input], b"");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        format!("Generated {}\n", target.display())
    );
    let bytes = fs::read(&target).unwrap();
    assert_eq!(&bytes[..4], b"\x7fELF");
}

#[test]
fn run_interprets_with_process_streams() {
    let dir = tempfile::tempdir().unwrap();
    let input = source_file(dir.path(), "echo.b", ",[.,]");
    let output = tapec(&["--run", &input], b"xyz\n");
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(output.stdout, b"yz\n");
}

#[test]
fn run_propagates_the_underflow_status() {
    let dir = tempfile::tempdir().unwrap();
    let input = source_file(dir.path(), "under.b", "<");
    let output = tapec(&["--run", &input], b"");
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        String::from_utf8_lossy(&output.stderr),
        "Error: Cannot move pointer to negative cell!\n"
    );
}

#[test]
fn stats_go_to_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let input = source_file(dir.path(), "s.b", "+++[-]");
    let output = tapec(&["--emit", "ir", "--stats", &input], b"");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Compilation Session Statistics:"));
    assert!(stderr.contains("Loops: 1"));
}

#[test]
fn missing_input_file_fails() {
    let output = tapec(&["/nonexistent/input.b"], b"");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("Could not read"));
}
