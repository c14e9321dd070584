// buildmatrix CLI
// Loads the matrix definition and template, resolves caller options, and
// drives a matrix run against the local Docker engine

use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Arg, ArgAction, Command};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;

use buildmatrix_service::{
    progress_channel, BuildEngine, DockerEngine, ExecutionEvent, Matrix, MatrixExecutor,
    MatrixParser, OptionValue, ResolvedOption,
};

/// Matrix definition file expected in the base directory
const MATRIX_FILE_NAME: &str = "matrix.yml";

/// Build-definition template expected in the base directory
const TEMPLATE_FILE_NAME: &str = "Dockerfile.tera";

fn base_command() -> Command {
    Command::new("buildmatrix")
        .about("Build a matrix of container images from one templated build definition")
        .arg(
            Arg::new("base_path")
                .value_name("BASE_PATH")
                .required(true)
                .help(format!(
                    "Directory containing {} and {}",
                    MATRIX_FILE_NAME, TEMPLATE_FILE_NAME
                )),
        )
}

/// Add one flag per option the matrix declares.
///
/// File options take a path value; plain options are boolean switches.
fn command_with_options(matrix: &Matrix) -> Command {
    let mut command = base_command();
    for option in &matrix.options {
        let arg = Arg::new(option.name.clone()).long(option.name.clone());
        let arg = if option.include_file {
            arg.value_name("PATH")
                .action(ArgAction::Set)
                .help("Local file to include in every build context")
        } else {
            arg.action(ArgAction::SetTrue)
                .help("Enable this build option")
        };
        command = command.arg(arg);
    }
    command
}

/// Resolve declared options against parsed flags, once for the whole run
fn resolve_options(
    matrix: &Matrix,
    matches: &clap::ArgMatches,
) -> Result<Vec<ResolvedOption>> {
    let mut resolved = Vec::with_capacity(matrix.options.len());
    for option in &matrix.options {
        let value = if option.include_file {
            match matches.get_one::<String>(&option.name) {
                Some(raw) => {
                    let expanded = shellexpand::tilde(raw).into_owned();
                    let local_path = std::fs::canonicalize(&expanded)
                        .wrap_err_with(|| format!("cannot resolve --{} {}", option.name, raw))?;
                    let context_name = local_path
                        .file_name()
                        .ok_or_else(|| eyre!("--{} {} has no file name", option.name, raw))?
                        .to_string_lossy()
                        .to_string();
                    OptionValue::File {
                        raw: raw.clone(),
                        local_path,
                        context_name,
                    }
                }
                None => OptionValue::Flag(false),
            }
        } else {
            OptionValue::Flag(matches.get_flag(&option.name))
        };
        resolved.push(ResolvedOption {
            name: option.name.clone(),
            value,
        });
    }
    Ok(resolved)
}

/// Recover the base path before the matrix's own options are known
fn peek_base_path() -> Option<PathBuf> {
    let matches = base_command()
        .ignore_errors(true)
        .disable_help_flag(true)
        .try_get_matches_from(env::args())
        .ok()?;
    matches.get_one::<String>("base_path").map(PathBuf::from)
}

fn print_event(event: ExecutionEvent) {
    match event {
        ExecutionEvent::MatrixStarted {
            total_combinations,
            blacklisted,
        } => {
            println!(
                "==> {} combinations to build ({} blacklisted)\n",
                total_combinations, blacklisted
            );
        }
        ExecutionEvent::CombinationSkipped { combination } => {
            println!("Combination {} is blacklisted, ignore it", combination);
        }
        ExecutionEvent::BuildStarted {
            image,
            combination,
            index,
            total,
        } => {
            println!(
                "==> [{}/{}] Building {} for combination {}",
                index + 1,
                total,
                image,
                combination
            );
        }
        ExecutionEvent::BuildOutput { text } => {
            print!("{}", text);
            let _ = std::io::stdout().flush();
        }
        ExecutionEvent::BuildSucceeded { image, combination } => {
            println!(
                "Image {} successfully built for combination {}\n",
                image, combination
            );
        }
        ExecutionEvent::BuildFailed {
            image,
            combination,
            error,
        } => {
            println!(
                "Failed to build image {} for combination {}: {}\n",
                image, combination, error
            );
        }
        ExecutionEvent::MatrixCompleted {
            succeeded,
            failed,
            duration,
        } => {
            println!(
                "==> Matrix completed in {:.1}s: {} succeeded, {} failed",
                duration.as_secs_f64(),
                succeeded,
                failed
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    // Phase one: the base path, ignoring flags declared by the matrix
    let base_path = match peek_base_path() {
        Some(path) => path,
        None => {
            // Let the real command produce usage/help output and exit;
            // if it returns, the positional was actually there
            let matches = base_command().get_matches();
            matches
                .get_one::<String>("base_path")
                .map(PathBuf::from)
                .ok_or_else(|| eyre!("missing BASE_PATH argument"))?
        }
    };

    let matrix = MatrixParser::from_file(base_path.join(MATRIX_FILE_NAME))
        .wrap_err_with(|| format!("loading {}", base_path.join(MATRIX_FILE_NAME).display()))?;

    let template_source = std::fs::read_to_string(base_path.join(TEMPLATE_FILE_NAME))
        .wrap_err_with(|| format!("loading {}", base_path.join(TEMPLATE_FILE_NAME).display()))?;

    // Phase two: the real parse, now with the matrix's own options
    let matches = command_with_options(&matrix).get_matches();
    let options = resolve_options(&matrix, &matches)?;

    let engine: Arc<dyn BuildEngine> = Arc::new(DockerEngine::connect()?);
    let (tx, mut rx) = progress_channel();
    let executor = MatrixExecutor::new(engine).with_progress(tx);

    let run = tokio::spawn(async move {
        executor
            .execute(&matrix, &template_source, &base_path, &options)
            .await
    });

    while let Some(event) = rx.recv().await {
        print_event(event);
    }

    // The run completes regardless of per-combination failures; only
    // configuration and engine transport errors surface here.
    run.await??;

    Ok(())
}
