use std::{
    fs,
    io::{Read, Write},
    os::unix::process::CommandExt,
    path::{Path, PathBuf},
    process::{Child, Command, Output, Stdio},
    thread,
    time::{Duration, Instant},
};

use nix::{
    libc,
    sys::signal::{kill, killpg, Signal},
    unistd::Pid,
};

fn orbit(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_orbit"));
    cmd.current_dir(dir)
        .env_remove("ORBIT_CONFIG")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

fn feed(mut cmd: Command, script: &str) -> Output {
    let mut child = cmd.spawn().expect("spawn orbit");
    child
        .stdin
        .take()
        .expect("orbit stdin")
        .write_all(script.as_bytes())
        .expect("write script");
    child.wait_with_output().expect("wait for orbit")
}

fn run(dir: &Path, script: &str) -> (String, String) {
    let output = feed(orbit(dir), script);
    assert!(output.status.success(), "orbit exited with {}", output.status);
    (
        String::from_utf8(output.stdout).unwrap(),
        String::from_utf8(output.stderr).unwrap(),
    )
}

/// Reads from `out` until the text seen so far ends with a prompt.
fn await_prompt(out: &mut impl Read, seen: &mut Vec<u8>) {
    let mut byte = [0u8; 1];
    loop {
        let n = out.read(&mut byte).expect("read orbit stdout");
        assert!(n > 0, "orbit closed stdout: {:?}", String::from_utf8_lossy(&seen[..]));
        seen.push(byte[0]);
        if seen.ends_with(b" > ") {
            return;
        }
    }
}

/// Starts orbit in its own process group, as a terminal would for a job.
fn spawn_interactive(dir: &Path) -> Child {
    let mut cmd = orbit(dir);
    cmd.process_group(0);
    cmd.spawn().expect("spawn orbit")
}

fn finish(mut child: Child, mut seen: Vec<u8>) -> (String, bool) {
    drop(child.stdin.take());
    child
        .stdout
        .take()
        .expect("orbit stdout")
        .read_to_end(&mut seen)
        .unwrap();
    let status = child.wait().unwrap();
    (String::from_utf8(seen).unwrap(), status.success())
}

fn prompt(dir: &Path) -> String {
    format!("🚀 {} > ", dir.display())
}

fn scratch() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().canonicalize().unwrap();
    (dir, path)
}

#[test]
fn whitespace_lines_are_noops() {
    let (_dir, cwd) = scratch();
    let (stdout, stderr) = run(&cwd, "\n   \n\t \t\n");

    let p = prompt(&cwd);
    assert_eq!(stdout, format!("{p}{p}{p}{p}exit\n"));
    assert_eq!(stderr, "");
}

#[test]
fn echo_prints_exactly_one_line() {
    let (_dir, cwd) = scratch();
    let (stdout, stderr) = run(&cwd, "echo hello\n");

    let p = prompt(&cwd);
    assert_eq!(stdout, format!("{p}hello\n{p}exit\n"));
    assert_eq!(stderr, "");
}

#[test]
fn output_redirection_round_trips() {
    let (_dir, cwd) = scratch();
    let (stdout, _) = run(&cwd, "echo hello > out.txt\ncat out.txt\n");

    assert_eq!(fs::read_to_string(cwd.join("out.txt")).unwrap(), "hello\n");
    assert_eq!(stdout.matches("hello\n").count(), 1);
}

#[test]
fn append_redirection_keeps_existing_output() {
    let (_dir, cwd) = scratch();
    run(&cwd, "echo a > log.txt\necho b >> log.txt\necho c >> log.txt\n");

    assert_eq!(fs::read_to_string(cwd.join("log.txt")).unwrap(), "a\nb\nc\n");
}

#[test]
fn input_redirection_reads_the_file() {
    let (_dir, cwd) = scratch();
    fs::write(cwd.join("in.txt"), "one\ntwo\nthree\n").unwrap();

    let (stdout, _) = run(&cwd, "wc -l < in.txt\n");

    assert!(stdout.contains("3\n"), "{stdout:?}");
}

#[test]
fn pipeline_passes_output_byte_for_byte() {
    let (_dir, cwd) = scratch();
    let data: String = (0..2000).map(|i| format!("line {i}\n")).collect();
    fs::write(cwd.join("data.txt"), &data).unwrap();

    let (stdout, stderr) = run(&cwd, "cat data.txt | cat > copy.txt\ncat data.txt | wc -l\n");

    assert_eq!(fs::read_to_string(cwd.join("copy.txt")).unwrap(), data);
    assert!(stdout.contains("2000\n"), "{stdout:?}");
    assert_eq!(stderr, "");
}

#[test]
fn pipeline_completes_before_the_next_prompt() {
    let (_dir, cwd) = scratch();
    let started = Instant::now();
    let (stdout, _) = run(&cwd, "sleep 1 | echo piped\necho next\n");

    // the left side finishes last, so the shell must have waited for it
    assert!(started.elapsed() >= Duration::from_secs(1));
    let piped = stdout.find("piped\n").unwrap();
    let next = stdout.find("next\n").unwrap();
    assert!(piped < next);
}

#[test]
fn redirections_apply_to_both_sides_of_a_pipe() {
    let (_dir, cwd) = scratch();
    fs::write(cwd.join("in.txt"), "b\nc\na\n").unwrap();

    run(&cwd, "cat < in.txt | sort > sorted.txt\n");

    assert_eq!(
        fs::read_to_string(cwd.join("sorted.txt")).unwrap(),
        "a\nb\nc\n"
    );
}

#[test]
fn later_pipes_are_passed_through() {
    let (_dir, cwd) = scratch();
    let (stdout, _) = run(&cwd, "true | echo a | b\n");

    assert!(stdout.contains("a | b\n"), "{stdout:?}");
}

#[test]
fn background_job_does_not_block() {
    let (_dir, cwd) = scratch();
    let mut cmd = orbit(&cwd);
    // the sleeping child must not hold our pipes open
    cmd.stderr(Stdio::null());

    let started = Instant::now();
    let output = feed(cmd, "sleep 5 > /dev/null &\necho after\n");
    let elapsed = started.elapsed();

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(elapsed < Duration::from_secs(4), "took {elapsed:?}");
    assert!(stdout.contains("Started background job with PID: "));

    let pid = stdout
        .split("PID: ")
        .nth(1)
        .and_then(|rest| rest.lines().next())
        .and_then(|pid| pid.trim().parse::<u32>().ok());
    assert!(pid.is_some(), "{stdout:?}");
    assert!(stdout.contains("after\n"));
}

#[test]
fn finished_background_job_is_reported() {
    let (_dir, cwd) = scratch();
    let (stdout, _) = run(&cwd, "true &\nsleep 1\necho done\n");

    assert!(stdout.contains("Started background job with PID: "));
    assert!(stdout.contains("] Done (exit 0)\n"), "{stdout:?}");
}

#[test]
fn cd_changes_prompt_and_child_directory() {
    let (_dir, cwd) = scratch();
    fs::create_dir(cwd.join("sub")).unwrap();

    let (stdout, stderr) = run(&cwd, "cd sub\npwd\n");

    let sub = cwd.join("sub");
    assert_eq!(
        stdout,
        format!("{}{}{}\n{}exit\n", prompt(&cwd), prompt(&sub), sub.display(), prompt(&sub))
    );
    assert_eq!(stderr, "");
}

#[test]
fn cd_to_missing_directory_reports_and_stays() {
    let (_dir, cwd) = scratch();
    let (stdout, stderr) = run(&cwd, "cd nope\npwd\n");

    assert!(stderr.contains("nope"), "{stderr:?}");
    assert!(stdout.contains(&format!("{}\n", cwd.display())));
    assert!(!stdout.contains("nope"));
}

#[test]
fn cd_without_argument_is_an_error() {
    let (_dir, cwd) = scratch();
    let (_, stderr) = run(&cwd, "cd\n");

    assert_eq!(stderr, "orbit: expected argument to \"cd\"\n");
}

#[test]
fn exit_stops_reading() {
    let (_dir, cwd) = scratch();
    let (stdout, _) = run(&cwd, "exit now please\necho after\n");

    assert!(!stdout.contains("after"));
    assert!(!stdout.ends_with("exit\n"));
}

#[test]
fn end_of_input_exits_cleanly() {
    let (_dir, cwd) = scratch();
    let (stdout, _) = run(&cwd, "");

    assert_eq!(stdout, format!("{}exit\n", prompt(&cwd)));
}

#[test]
fn help_is_stable() {
    let (_dir, cwd) = scratch();
    let (stdout, _) = run(&cwd, "help\nhelp\n");

    let p = prompt(&cwd);
    let listings: Vec<&str> = stdout.split(&p).filter(|s| !s.is_empty()).collect();
    assert_eq!(listings.len(), 3);
    assert_eq!(listings[0], listings[1]);
    assert!(listings[0].contains("  cd\n  exit\n  help\n"));
    assert_eq!(listings[2], "exit\n");
}

#[test]
fn unknown_command_fails_only_that_command() {
    let (_dir, cwd) = scratch();
    let (stdout, stderr) = run(&cwd, "orbit-test-no-such-program\necho still here\n");

    assert_eq!(
        stderr,
        "orbit: orbit-test-no-such-program: command not found\n"
    );
    assert!(stdout.contains("still here\n"));
}

#[test]
fn missing_input_file_is_reported_by_the_child() {
    let (_dir, cwd) = scratch();
    let (stdout, stderr) = run(&cwd, "cat < missing.txt\necho ok\n");

    assert!(stderr.starts_with("orbit: missing.txt: "), "{stderr:?}");
    assert!(stdout.contains("ok\n"));
}

#[test]
fn malformed_lines_are_rejected() {
    let (_dir, cwd) = scratch();
    let (stdout, stderr) = run(&cwd, "echo hi >\n| wc\nls | wc &\necho fine\n");

    assert!(stderr.contains("missing file name after `>`"));
    assert!(stderr.contains("missing command on the left side of `|`"));
    assert!(stderr.contains("background pipelines are not supported"));
    assert!(stdout.contains("fine\n"));
    assert!(!stdout.contains("hi\n"));
}

#[test]
fn long_lines_are_discarded() {
    let (_dir, cwd) = scratch();
    let script = format!("echo {}\necho short\n", "x".repeat(2000));
    let (stdout, stderr) = run(&cwd, &script);

    assert!(stderr.contains("maximum length"));
    assert!(!stdout.contains("xxxx"));
    assert!(stdout.contains("short\n"));
}

#[test]
fn config_file_changes_the_prompt() {
    let (_dir, cwd) = scratch();
    fs::write(cwd.join("orbit.toml"), "prompt_symbol = \"$\"\n").unwrap();

    let (stdout, _) = run(&cwd, "");

    assert_eq!(stdout, format!("$ {} > exit\n", cwd.display()));
}

#[test]
fn unknown_path_reports_the_os_error() {
    let (_dir, cwd) = scratch();
    let (_, stderr) = run(&cwd, "./no-such-program\n");

    assert_eq!(
        stderr,
        "orbit: ./no-such-program: No such file or directory\n"
    );
}

#[test]
fn interrupt_while_idle_redraws_the_prompt() {
    let (_dir, cwd) = scratch();
    let mut child = spawn_interactive(&cwd);
    let pid = Pid::from_raw(child.id() as i32);
    let mut stdout = child.stdout.take().unwrap();
    let mut seen = Vec::new();

    await_prompt(&mut stdout, &mut seen);
    child.stdin.as_mut().unwrap().write_all(b"echo disca").unwrap();
    thread::sleep(Duration::from_millis(200));
    kill(pid, Signal::SIGINT).unwrap();
    await_prompt(&mut stdout, &mut seen);

    kill(pid, Signal::SIGQUIT).unwrap();
    child.stdin.as_mut().unwrap().write_all(b"echo alive\n").unwrap();

    child.stdout = Some(stdout);
    let (text, success) = finish(child, seen);

    assert!(success, "{text:?}");
    assert!(text.contains("alive\n"), "{text:?}");
    assert!(!text.contains("disca"), "{text:?}");
}

#[test]
fn interrupt_stops_the_foreground_job_only() {
    let (_dir, cwd) = scratch();
    let mut child = spawn_interactive(&cwd);
    let pid = Pid::from_raw(child.id() as i32);
    let mut stdout = child.stdout.take().unwrap();
    let mut seen = Vec::new();

    await_prompt(&mut stdout, &mut seen);
    let started = Instant::now();
    child.stdin.as_mut().unwrap().write_all(b"sleep 5\n").unwrap();
    thread::sleep(Duration::from_millis(500));

    // the whole group, like a terminal's ^C
    killpg(pid, Signal::SIGINT).unwrap();
    await_prompt(&mut stdout, &mut seen);
    assert!(started.elapsed() < Duration::from_secs(4));

    child.stdin.as_mut().unwrap().write_all(b"echo alive\n").unwrap();

    child.stdout = Some(stdout);
    let (text, success) = finish(child, seen);

    assert!(success, "{text:?}");
    assert!(text.contains("alive\n"), "{text:?}");
}

#[test]
fn children_do_not_inherit_ignored_quit() {
    let (_dir, cwd) = scratch();
    run(&cwd, "grep SigIgn /proc/self/status > ignored.txt\n");

    let line = fs::read_to_string(cwd.join("ignored.txt")).unwrap();
    let mask = line.trim().trim_start_matches("SigIgn:").trim();
    let mask = u64::from_str_radix(mask, 16).unwrap();

    assert_eq!(mask & (1 << (libc::SIGQUIT - 1)), 0, "{line:?}");
    assert_eq!(mask & (1 << (libc::SIGINT - 1)), 0, "{line:?}");
}
