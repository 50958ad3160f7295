use std::io::{self, Write};
use std::path::Path;
use std::process::Command;

use harness::{Outcome, Runner, TestCase};

use crate::config::Config;

fn green_dot(no_color: bool) -> &'static str {
    if no_color { "." } else { "\x1b[1m\x1b[32m.\x1b[0m" }
}

fn bold_red(s: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[1m\x1b[31m{}\x1b[0m", s)
    }
}

/// Compile `<prog_name>.cpp` into the configured binary.
fn compile(prog_name: &str, config: &Config) -> Result<(), String> {
    let source = format!("./{}.cpp", prog_name);
    log::info!("compiling {} with {}", source, config.compiler);

    let status = Command::new(&config.compiler)
        .args(&config.compiler_args)
        .arg(&source)
        .arg("-o")
        .arg(&config.binary)
        .status()
        .map_err(|e| format!("cannot run '{}': {}", config.compiler, e))?;

    if !status.success() {
        return Err(format!("compiling {} failed ({})", source, status));
    }
    Ok(())
}

/// Describe a failed case the way a contestant wants to read it.
fn failure_report(case: &TestCase, outcome: &Outcome, timeout_secs: u64, no_color: bool) -> String {
    let mut report = String::new();
    report.push_str(&bold_red(
        &format!("Failure on test #{}, with input:", case.num),
        no_color,
    ));
    report.push('\n');
    for line in &case.input {
        report.push_str(line);
        report.push('\n');
    }

    match outcome {
        Outcome::Pass => {}
        Outcome::WrongAnswer { actual } => {
            report.push_str(&bold_red("Your output:", no_color));
            report.push('\n');
            for line in actual {
                report.push_str(line);
                report.push('\n');
            }
            report.push_str(&bold_red("Expected:", no_color));
            report.push('\n');
            for line in &case.expected {
                report.push_str(line);
                report.push('\n');
            }
        }
        Outcome::RuntimeError { status, stderr } => {
            report.push_str(&bold_red(
                &format!("Error from your program ({}):", status),
                no_color,
            ));
            report.push('\n');
            report.push_str(stderr.trim_end());
            report.push('\n');
        }
        Outcome::Timeout => {
            report.push_str(&bold_red(
                &format!("Time limit exceeded ({}s)", timeout_secs),
                no_color,
            ));
            report.push('\n');
        }
    }

    report
}

/// Run `cases` in order, stopping at the first failure.
/// If `testnum` is set, only that case runs.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_cases(
    runner: &Runner,
    cases: &[TestCase],
    testnum: Option<usize>,
    no_color: bool,
    out: &mut impl Write,
) -> io::Result<i32> {
    let timeout_secs = runner.timeout().as_secs();
    let mut ran = 0usize;

    for case in cases.iter().filter(|case| testnum.is_none_or(|n| case.num == n)) {
        ran += 1;
        match runner.run(case) {
            Ok(Outcome::Pass) => {
                write!(out, "{}", green_dot(no_color))?;
                out.flush()?;
            }
            Ok(outcome) => {
                writeln!(out)?;
                write!(out, "{}", failure_report(case, &outcome, timeout_secs, no_color))?;
                return Ok(1);
            }
            Err(e) => {
                writeln!(out)?;
                eprintln!("error: test #{}: {}", case.num, e);
                return Ok(1);
            }
        }
    }
    writeln!(out)?;

    if ran == 0 {
        if let Some(n) = testnum {
            eprintln!("error: there is no test #{} ({} cases)", n, cases.len());
            return Ok(1);
        }
    }
    Ok(0)
}

/// Compile `<prog_name>.cpp` and run it against `<prog_name>.in`.
pub fn run_tests(prog_name: &str, testnum: Option<usize>, config: &Config, no_color: bool) -> i32 {
    if let Err(e) = compile(prog_name, config) {
        eprintln!("error: {}", e);
        return 1;
    }

    let fixture = format!("{}.in", prog_name);
    let cases = match harness::load_fixture(Path::new(&fixture)) {
        Ok(cases) => cases,
        Err(e) => {
            eprintln!("error: {}", e);
            return 1;
        }
    };

    let runner = Runner::new(&config.binary).with_timeout(config.timeout());
    let mut stdout = io::stdout();
    match run_cases(&runner, &cases, testnum, no_color, &mut stdout) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(num: usize, input: &[&str], expected: &[&str]) -> TestCase {
        TestCase {
            num,
            input: input.iter().map(|l| l.to_string()).collect(),
            expected: expected.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[test]
    fn wrong_answer_report() {
        let report = failure_report(
            &case(3, &["1 2"], &["3"]),
            &Outcome::WrongAnswer {
                actual: vec!["4".to_string()],
            },
            8,
            true,
        );
        assert_eq!(
            report,
            "Failure on test #3, with input:\n1 2\nYour output:\n4\nExpected:\n3\n"
        );
    }

    #[test]
    fn timeout_report() {
        let report = failure_report(&case(1, &["5"], &["5"]), &Outcome::Timeout, 8, true);
        assert!(report.ends_with("Time limit exceeded (8s)\n"));
    }

    #[test]
    fn colored_labels() {
        assert_eq!(green_dot(true), ".");
        assert!(bold_red("x", false).starts_with("\x1b[1m"));
    }

    #[cfg(unix)]
    mod process {
        use super::*;

        fn echo_runner(dir: &Path) -> Runner {
            let script = dir.join("echo.sh");
            std::fs::write(&script, "cat\n").unwrap();
            Runner::new("/bin/sh").arg(script)
        }

        #[test]
        fn stops_at_first_failure() {
            let dir = tempfile::tempdir().expect("failed to create temp dir");
            let runner = echo_runner(dir.path());
            let cases = vec![
                case(1, &["a"], &["a"]),
                case(2, &["b"], &["c"]),
                case(3, &["d"], &["d"]),
            ];

            let mut out = Vec::new();
            let code = run_cases(&runner, &cases, None, true, &mut out).unwrap();
            let out = String::from_utf8(out).unwrap();
            assert_eq!(code, 1);
            assert!(out.starts_with(".\nFailure on test #2"));
            assert!(!out.contains("#3"));
        }

        #[test]
        fn single_case() {
            let dir = tempfile::tempdir().expect("failed to create temp dir");
            let runner = echo_runner(dir.path());
            let cases = vec![case(1, &["a"], &["x"]), case(2, &["b"], &["b"])];

            let mut out = Vec::new();
            assert_eq!(run_cases(&runner, &cases, Some(2), true, &mut out).unwrap(), 0);
            assert_eq!(String::from_utf8(out).unwrap(), ".\n");

            let mut out = Vec::new();
            assert_eq!(run_cases(&runner, &cases, Some(7), true, &mut out).unwrap(), 1);
        }
    }
}
