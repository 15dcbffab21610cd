#![forbid(unsafe_code)]

//! nbpreview binary entry point.

use std::io::{self, IsTerminal, Read};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use nbpreview::NotebookRenderer;
use nbpreview::cli::Cli;
use nbpreview::themes::{MAX_SAMPLE_WIDTH, theme_gallery};
use nbpreview_core::{Notebook, NotebookError, RenderFeatureFlags, TerminalCapabilities};
use nbpreview_render::{Console, ConsoleOptions};
use nbpreview_style::{Color, Style};
use nbpreview_text::Line;
use tracing_subscriber::EnvFilter;

/// Error message color.
const ERROR_STYLE: Style = Style::new().fg(Color::rgb(0xB3, 0x26, 0x1E));

fn init_tracing() {
    let filter = EnvFilter::try_from_env("NBPREVIEW_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("nbpreview: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let caps = TerminalCapabilities::detect();
    if cli.list_themes {
        list_themes(cli, &caps)?;
        return Ok(ExitCode::SUCCESS);
    }

    let options = cli.render_options(cli.relative_dir(), caps.no_color);
    let flags = RenderFeatureFlags::resolve(&options, &caps);

    let notebook = match load(cli) {
        Ok(notebook) => notebook,
        Err(error) if error.is_invalid_document() => {
            tracing::debug!(%error, "notebook rejected");
            let message = format!("{} is not a valid Jupyter Notebook path.", cli.display_name());
            let console_options = ConsoleOptions::new(flags.width).profile(flags.color_profile);
            let mut console = Console::new(io::stderr(), console_options);
            console.print(&Line::styled(message, ERROR_STYLE))?;
            return Ok(ExitCode::from(1));
        }
        Err(error) => {
            return Err(error).with_context(|| format!("could not open {}", cli.display_name()));
        }
    };

    let renderer = NotebookRenderer::new(flags);
    renderer
        .print(&notebook, io::stdout().lock())
        .context("could not write to stdout")?;
    Ok(ExitCode::SUCCESS)
}

fn load(cli: &Cli) -> Result<Notebook, NotebookError> {
    match cli.path() {
        Some(path) => Notebook::from_path(path),
        None => {
            let mut bytes = Vec::new();
            io::stdin()
                .read_to_end(&mut bytes)
                .map_err(|source| NotebookError::Io {
                    path: "<stdin>".into(),
                    source,
                })?;
            Notebook::from_slice(&bytes)
        }
    }
}

fn list_themes(cli: &Cli, caps: &TerminalCapabilities) -> Result<()> {
    let options = cli.render_options(cli.relative_dir(), caps.no_color);
    let flags = RenderFeatureFlags::resolve(&options, caps);
    let samples = io::stdout().is_terminal();
    let console_options = ConsoleOptions::new(flags.width.min(MAX_SAMPLE_WIDTH))
        .profile(flags.color_profile)
        .ascii_only(!flags.unicode);
    let mut console = Console::new(io::stdout().lock(), console_options);
    console
        .print(&theme_gallery(samples, flags.unicode))
        .context("could not write to stdout")?;
    Ok(())
}
