mod config;
mod prompt;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use config::ToolConfig;
use engine_fetch::{
    ArchiveRetention, InstallLayout, Installer, ProjectFormatter, RunOptions, RunOutcome,
};
use prompt::TerminalPrompt;

#[derive(Parser, Debug)]
#[command(name = "download-engine")]
#[command(about = "Download the engine archive and install it into the project")]
struct Args {
    /// Whether to remove the downloaded zip file, 'yes' or 'no'
    #[arg(short = 'r', long = "remove-download", value_name = "yes|no")]
    remove_download: Option<ArchiveRetention>,

    /// Force the update even when the engine is already installed
    #[arg(short = 'f', long = "force-update")]
    force_update: bool,

    /// Only download the zip file, do not extract it
    #[arg(short = 'd', long = "download-only")]
    download_only: bool,

    /// Project root the engine is installed into
    #[arg(short = 'w', long = "work-dir", value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// Descriptor file (default: <work-dir>/libs/config.json)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Don't draw a progress bar
    #[arg(long = "no-progress")]
    no_progress: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "debug"
    } else {
        "warn,engine_fetch=info,download_engine=info"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format(|buf, record| match record.level() {
            log::Level::Error => writeln!(buf, "{} {}", style("==> Error:").red().bold(), record.args()),
            log::Level::Warn => {
                writeln!(buf, "{} {}", style("==> WARNING:").yellow().bold(), record.args())
            }
            log::Level::Info => writeln!(buf, "==> {}", record.args()),
            _ => writeln!(buf, "{} {}", style(format!("[{}]", record.target())).dim(), record.args()),
        })
        .init();
}

async fn run(args: Args) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
    let work_root = match args.work_dir {
        Some(dir) => dir
            .canonicalize()
            .with_context(|| format!("Failed to resolve work directory {}", dir.display()))?,
        None => cwd.clone(),
    };

    let tool_config = ToolConfig::load(&work_root)?.unwrap_or_default();
    let mut installer_config = tool_config.installer_config();
    if args.no_progress {
        installer_config.progress = false;
    }

    let descriptor_path = args
        .config
        .or_else(|| tool_config.install.descriptor.as_ref().map(|p| work_root.join(p)))
        .unwrap_or_else(|| InstallLayout::default_descriptor_path(&work_root));

    println!("=======================================================");
    println!("==> Prepare to download cocos2d-x engine!");

    let installer = Installer::load(&work_root, &descriptor_path, &cwd, installer_config)
        .context("Failed to load the engine descriptor")?;

    let options = RunOptions {
        retention: args.remove_download.unwrap_or(ArchiveRetention::Ask),
        force_update: args.force_update,
        download_only: args.download_only,
    };

    let outcome = installer
        .run(options, &ProjectFormatter::new(), &TerminalPrompt::new())
        .await
        .context("Engine install failed")?;

    match outcome {
        RunOutcome::UpToDate => {}
        RunOutcome::Downloaded { archive } => {
            println!(
                "{} Downloaded {}",
                style("Success:").green().bold(),
                archive.display()
            );
        }
        RunOutcome::Installed {
            engine_dir,
            archive_kept,
            relocated,
            formatted,
            ..
        } => {
            for (from, to) in &relocated.moved {
                println!("  {} {} -> {}", style("✓").green(), from.display(), to.display());
            }
            for file in &formatted.modified {
                println!("  {} Updated {}", style("✓").green(), file.display());
            }
            if archive_kept {
                println!("==> Keeping the downloaded archive");
            }
            println!(
                "{} Engine installed to {}",
                style("Success:").green().bold(),
                engine_dir.display()
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}
