use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const HANDLER_BIN: &str = "increment_handler";
const HANDLER_STAGING_DIR: &str = "target/lambda/increment_handler";

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the Lambda basics workspace",
    long_about = "A unified CLI for packaging the native handler, running the\n\
                  live scenario, and running CI checks in the Lambda basics workspace."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive create/invoke/update/delete scenario against AWS
    Scenario {
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
        /// Leave the function and role in place afterwards
        #[arg(long)]
        keep_resources: bool,
        /// Deploy the native handler staged by `package-handler`
        #[arg(long)]
        native: bool,
    },
    /// Build the native handler and stage it as a Lambda `bootstrap`
    PackageHandler {
        /// Compilation target triple for the handler binary
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build profile used for the binary
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
    },
    /// Run CI checks (fmt, clippy, tests)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
    /// Run the ignored tests that create resources in a live AWS account
    LiveTest,
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting and clippy
    Lint,
    /// Unit and fake-backed integration tests
    Test,
    /// Run lint + test
    Check,
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    fn as_cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo")
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn package_native_handler(target: &str, profile: BuildProfile) {
    ensure_rust_target_installed(target);

    step("Build native handler binary");
    let mut cargo_args = vec![
        "build",
        "-p",
        "lambda_basics_aws",
        "--target",
        target,
        "--bin",
        HANDLER_BIN,
    ];
    if let Some(flag) = profile.as_cargo_flag() {
        cargo_args.push(flag);
    }
    run_cargo(&cargo_args);

    step("Stage bootstrap and zip artifact");
    let binary_path = Path::new("target")
        .join(target)
        .join(profile.dir_name())
        .join(binary_name(HANDLER_BIN, target));
    let staging_dir = Path::new(HANDLER_STAGING_DIR);
    fs::create_dir_all(staging_dir).expect("failed to create handler staging directory");

    let bootstrap_path = staging_dir.join("bootstrap");
    stage_bootstrap(&binary_path, &bootstrap_path);
    package_lambda_zip(&bootstrap_path, &staging_dir.join("bootstrap.zip"));

    eprintln!(
        "\nStaged handler:\n- {}\n- {}\n\nDeploy it with `cargo xtask scenario --native`.",
        bootstrap_path.display(),
        staging_dir.join("bootstrap.zip").display()
    );
}

fn ensure_rust_target_installed(target: &str) {
    let output = Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output();

    let output = match output {
        Ok(value) => value,
        Err(error) => {
            eprintln!(
                "warning: failed to run `rustup target list --installed` ({error}); continuing without target preflight"
            );
            return;
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "failed to list installed rust targets; run `rustup target list --installed` manually. details: {}",
            stderr.trim()
        );
    }

    let installed = String::from_utf8_lossy(&output.stdout);
    if !installed.lines().any(|line| line.trim() == target) {
        panic!(
            "required rust target `{target}` is not installed. install it with `rustup target add {target}` and re-run `cargo xtask package-handler`"
        );
    }
}

fn binary_name(bin_name: &str, target: &str) -> String {
    if target.contains("windows") {
        format!("{bin_name}.exe")
    } else {
        bin_name.to_string()
    }
}

fn stage_bootstrap(binary_path: &Path, bootstrap_path: &Path) {
    if !binary_path.exists() {
        panic!("expected handler binary at '{}'", binary_path.display());
    }
    fs::copy(binary_path, bootstrap_path).expect("failed to copy handler binary to bootstrap");
}

fn package_lambda_zip(binary_path: &Path, zip_path: &Path) {
    let binary = fs::read(binary_path).expect("failed to read bootstrap binary");
    let file = fs::File::create(zip_path).expect("failed to create lambda zip");
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file("bootstrap", options)
        .expect("failed to start bootstrap entry in lambda zip");
    zip.write_all(&binary)
        .expect("failed to write bootstrap entry");
    zip.finish().expect("failed to finish lambda zip");
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_lint() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);
}

fn ci_test() {
    step("Test lambda_basics_core");
    run_cargo(&["test", "-p", "lambda_basics_core"]);

    step("Test lambda_basics_aws");
    run_cargo(&["test", "-p", "lambda_basics_aws"]);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scenario {
            yes,
            keep_resources,
            native,
        } => {
            let mut args = vec!["run", "-p", "lambda_basics_aws", "--bin", "scenario", "--"];
            if yes {
                args.push("--yes");
            }
            if keep_resources {
                args.push("--keep-resources");
            }
            if native {
                if !Path::new(HANDLER_STAGING_DIR).join("bootstrap").is_file() {
                    eprintln!("no staged handler found; run `cargo xtask package-handler` first");
                    exit(1);
                }
                args.extend(["--native-handler", HANDLER_STAGING_DIR]);
            }
            run_cargo(&args);
        }
        Commands::PackageHandler { target, profile } => {
            package_native_handler(&target, profile);
        }
        Commands::Ci { job } => {
            match job {
                CiJob::Lint => ci_lint(),
                CiJob::Test => ci_test(),
                CiJob::Check => {
                    ci_lint();
                    ci_test();
                }
            }
            eprintln!("\nCI job passed.");
        }
        Commands::LiveTest => {
            run_cargo(&[
                "test",
                "-p",
                "lambda_basics_aws",
                "--test",
                "live_aws_tests",
                "--",
                "--ignored",
            ]);
        }
    }
}
