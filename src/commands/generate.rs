//! `generate` subcommand: shell completions and man pages.
use anyhow::{Context, Result};
use clap_complete::Shell;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes completions for `shell` to `writer`.
pub fn write_completions<W: Write>(
    shell: Shell,
    cmd: &mut clap::Command,
    writer: &mut W,
) {
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, cmd, name, writer);
}

/// Renders the man page of `cmd` and of every subcommand, recursively, into
/// `output_dir` (the current directory if `None`). Subcommand pages are named
/// `<parent>-<sub>.1`. Returns the written files in creation order.
///
/// # Errors
///
/// Returns an error if the output directory or a page cannot be written.
pub fn generate_man_pages(
    cmd: &clap::Command,
    output_dir: Option<PathBuf>,
) -> Result<Vec<PathBuf>> {
    let output_dir = match output_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("resolve current directory")?,
    };
    std::fs::create_dir_all(&output_dir).with_context(|| {
        format!("create man page directory {}", output_dir.display())
    })?;

    let mut written = Vec::new();
    render_page(cmd.clone(), &output_dir, &mut written)?;
    render_subcommands(cmd, cmd.get_name(), &output_dir, &mut written)?;
    Ok(written)
}

fn render_subcommands(
    cmd: &clap::Command,
    prefix: &str,
    output_dir: &Path,
    written: &mut Vec<PathBuf>,
) -> Result<()> {
    for sub in cmd.get_subcommands() {
        let name = format!("{prefix}-{}", sub.get_name());
        // clap_mangen takes the page title from the command name
        let renamed = sub.clone().name(name.clone()).disable_help_subcommand(true);
        render_page(renamed, output_dir, written)?;
        render_subcommands(sub, &name, output_dir, written)?;
    }
    Ok(())
}

fn render_page(
    cmd: clap::Command,
    output_dir: &Path,
    written: &mut Vec<PathBuf>,
) -> Result<()> {
    let path = output_dir.join(format!("{}.1", cmd.get_name()));
    let mut file = File::create(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    clap_mangen::Man::new(cmd)
        .render(&mut file)
        .with_context(|| format!("failed to render {}", path.display()))?;
    written.push(path);
    Ok(())
}
