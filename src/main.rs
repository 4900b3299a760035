use cfg_if::cfg_if;
use clap::Parser;
use env_logger::Env;
use libmondai::ai::AiError;
use libmondai::mondai::Problem;
use libmondai::settei::AiSettings;
use log::{debug, info};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

mod libmondai;

#[cfg(feature = "cli")]
mod cli;
#[cfg(feature = "gui")]
mod gui;

#[derive(Parser, Debug)]
#[command(name = "問題詳細 (Mondaishōsai)")]
#[command(version, about, long_about = None)]
struct Args {
    /// Problem record (JSON) to open.
    #[arg(value_name = "FILE")]
    problem: PathBuf,
    #[arg(long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Where to write the answered problem. Defaults to stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Extra font for the dialog, e.g. a CJK font.
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,
    #[arg(short, long, default_value = "error")]
    log_level: String,
}

#[derive(Debug, Error)]
enum Error {
    #[error("cannot read or write problem file")]
    ProblemIo(#[from] io::Error),
    #[error("malformed problem JSON: {0}")]
    ProblemJson(#[from] serde_json::Error),
    #[error("cannot set up AI client: {0}")]
    Ai(#[from] AiError),
    #[cfg(feature = "gui")]
    #[error("GUI failed: {0}")]
    Gui(#[from] eframe::Error),
}

cfg_if! {
    if #[cfg(feature = "cli")] {
        fn run_dialog(problem: &mut Problem, settings: AiSettings, _args: &Args) -> Result<bool, Error> {
            cli::cli_loop(problem, settings)
        }
    } else if #[cfg(feature = "gui")] {
        fn run_dialog(problem: &mut Problem, settings: AiSettings, args: &Args) -> Result<bool, Error> {
            gui::init_gui(problem, settings, args.font.as_deref())
        }
    } else {
        compile_error!("enable either the `gui` or the `cli` feature");
    }
}

fn main() -> Result<(), Error> {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_level.as_str())).init();

    let json = std::fs::read_to_string(&args.problem)?;
    let mut problem = Problem::from_json(&json)?;
    debug!("[Setup] Problem: {:?}", problem);

    let settings = AiSettings::load(&args.config);
    debug!("[Setup] Model {} at {}", settings.model, settings.base_url);

    let confirmed = run_dialog(&mut problem, settings, &args)?;

    if !confirmed {
        info!("[Setup] Dialog cancelled, nothing written");
        return Ok(());
    }

    let updated = problem.to_json()?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, updated)?;
            info!("[Setup] Wrote answered problem to {:?}", path);
        }
        None => println!("{updated}"),
    }
    Ok(())
}
