mod config;
mod test_runner;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use onefile::{MergeError, Merger};

use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "contest_tools",
    version,
    about = "Useful tools for programming contests",
    infer_subcommands = true
)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Configuration file (defaults to ./contest_tools.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write <PROG_NAME>-submit.cpp with only the library blocks it uses
    Onefile(OnefileArgs),

    /// Compile <PROG_NAME>.cpp and run it against the cases in <PROG_NAME>.in
    Runtest(RuntestArgs),
}

#[derive(clap::Args)]
struct OnefileArgs {
    /// Program name, without the .cpp extension
    prog_name: String,

    /// Directory holding the snippet libraries
    libdir: Option<String>,
}

#[derive(clap::Args)]
struct RuntestArgs {
    /// Program name, without the .cpp extension
    prog_name: String,

    /// Run only this test case (1-based)
    #[arg(long)]
    testnum: Option<usize>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    match cli.command {
        Command::Onefile(args) => process::exit(do_onefile(args, &config, cli.no_color)),
        Command::Runtest(args) => {
            let prog_name = program_stem(&args.prog_name);
            let exit_code = test_runner::run_tests(prog_name, args.testnum, &config, cli.no_color);
            process::exit(exit_code);
        }
    }
}

/// Accept `a` as well as `a.cpp`.
fn program_stem(prog_name: &str) -> &str {
    prog_name.strip_suffix(".cpp").unwrap_or(prog_name)
}

/// Merge `<prog>.cpp` into `<prog>-submit.cpp`. Returns the process exit code.
fn do_onefile(args: OnefileArgs, config: &Config, no_color: bool) -> i32 {
    let Some(libdir) = args.libdir.or_else(|| config.libdir.clone()) else {
        eprintln!(
            "error: no library directory given (pass one or set `libdir` in {})",
            config::DEFAULT_CONFIG
        );
        return 1;
    };
    let libdir = libdir.trim_end_matches('/');
    if !Path::new(libdir).is_dir() {
        eprintln!(
            "error: looking for code snippets in '{}', but this directory does not exist",
            libdir
        );
        return 1;
    }

    let prog_name = program_stem(&args.prog_name);
    let main_file = format!("{}.cpp", prog_name);
    let mut files = SimpleFiles::new();
    let merger = match onefile::merge(&main_file, libdir, &mut files) {
        Ok(merger) => merger,
        Err(error) => {
            emit_merge_error(&error, &files, no_color);
            return 1;
        }
    };

    let output = format!("{}-submit.cpp", prog_name);
    if let Err(e) = write_output(&merger, Path::new(&output)) {
        eprintln!("error: cannot write '{}': {}", output, e);
        return 1;
    }
    log::info!("wrote {}", output);
    0
}

fn write_output(merger: &Merger, path: &Path) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    merger.write(&mut out)?;
    out.flush()
}

fn emit_merge_error(error: &MergeError, files: &SimpleFiles<String, String>, no_color: bool) {
    let Some(parse_error) = error.as_parse_error() else {
        eprintln!("error: {}", error);
        return;
    };

    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    let diagnostic = parse_error.to_diagnostic();
    let _ = term::emit_to_write_style(&mut writer.lock(), &config, files, &diagnostic);
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn prefixes_select_commands() {
        let cli = Cli::try_parse_from(["contest_tools", "on", "a", "lib"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Onefile(ref args) if args.prog_name == "a" && args.libdir.as_deref() == Some("lib")
        ));

        let cli = Cli::try_parse_from(["contest_tools", "r", "a", "--testnum", "2"]).unwrap();
        assert!(matches!(cli.command, Command::Runtest(ref args) if args.testnum == Some(2)));

        let cli = Cli::try_parse_from(["contest_tools", "--no-color", "onefile", "a"]).unwrap();
        assert!(cli.no_color);
        assert!(matches!(cli.command, Command::Onefile(ref args) if args.libdir.is_none()));
    }

    #[test]
    fn unknown_command_rejected() {
        assert!(Cli::try_parse_from(["contest_tools", "build", "a"]).is_err());
        assert!(Cli::try_parse_from(["contest_tools"]).is_err());
    }

    const FOO: &str = "namespace foo {\n//::bar\nvoid bar(){}\n} // namespace\n";

    /// A temp dir holding `lib/foo.cpp` and `a.cpp` including it.
    fn workspace(library: &str) -> (tempfile::TempDir, String, String) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let libdir = dir.path().join("lib");
        std::fs::create_dir(&libdir).unwrap();
        std::fs::write(libdir.join("foo.cpp"), library).unwrap();

        let libdir = libdir.to_str().unwrap().to_string();
        std::fs::write(
            dir.path().join("a.cpp"),
            format!("#include <iostream>\n#include \"{libdir}/foo.cpp\"\nint main(){{ foo::bar(); }}\n"),
        )
        .unwrap();
        let prog_name = dir.path().join("a").to_str().unwrap().to_string();
        (dir, prog_name, libdir)
    }

    fn onefile_args(prog_name: &str, libdir: &str) -> OnefileArgs {
        OnefileArgs {
            prog_name: prog_name.to_string(),
            libdir: Some(libdir.to_string()),
        }
    }

    #[test]
    fn onefile_writes_submit_file() {
        let (dir, prog_name, libdir) = workspace(FOO);

        let code = do_onefile(onefile_args(&prog_name, &format!("{libdir}/")), &Config::default(), true);
        assert_eq!(code, 0);

        let merged = std::fs::read_to_string(dir.path().join("a-submit.cpp")).unwrap();
        assert_eq!(
            merged,
            "#include <iostream>\nnamespace foo {\n\nvoid bar(){}\n\n}\nint main(){ foo::bar(); }\n"
        );
    }

    #[test]
    fn onefile_accepts_cpp_suffix_and_config_libdir() {
        let (dir, prog_name, libdir) = workspace(FOO);
        let config = Config {
            libdir: Some(libdir),
            ..Config::default()
        };
        let args = OnefileArgs {
            prog_name: format!("{prog_name}.cpp"),
            libdir: None,
        };

        assert_eq!(do_onefile(args, &config, true), 0);
        assert!(dir.path().join("a-submit.cpp").is_file());
    }

    #[test]
    fn onefile_missing_libdir_fails() {
        let (dir, prog_name, _) = workspace(FOO);
        let missing = dir.path().join("nope");

        let code = do_onefile(onefile_args(&prog_name, missing.to_str().unwrap()), &Config::default(), true);
        assert_eq!(code, 1);
        assert!(!dir.path().join("a-submit.cpp").exists());

        let args = OnefileArgs {
            prog_name,
            libdir: None,
        };
        assert_eq!(do_onefile(args, &Config::default(), true), 1);
    }

    #[test]
    fn onefile_parse_error_writes_nothing() {
        let (dir, prog_name, libdir) = workspace("namespace foo {\n//::bar\nvoid bar(){}\n");

        assert_eq!(do_onefile(onefile_args(&prog_name, &libdir), &Config::default(), true), 1);
        assert!(!dir.path().join("a-submit.cpp").exists());
    }

    #[test]
    fn stem() {
        assert_eq!(program_stem("a"), "a");
        assert_eq!(program_stem("a.cpp"), "a");
        assert_eq!(program_stem("dir/b.cpp"), "dir/b");
    }
}
