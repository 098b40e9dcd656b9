use std::io::Write;
use std::path::Path;

use owo_colors::OwoColorize;
use papersum_core::{
    BatchReport, ModelConfig, ProgressEvent, RunContext, SourceDocument, generate_id,
};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print what this run is about to do.
pub fn print_run_header(
    w: &mut dyn Write,
    papers: &Path,
    provider: &str,
    run: &RunContext,
    model: &ModelConfig,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w, "Summarizing papers from {}", papers.display())?;
    let detail = format!(
        "({} model {}, temperature {}, output {})",
        provider,
        model.model_name(),
        model.temperature(),
        run.output_dir().display()
    );
    if color.enabled() {
        writeln!(w, "{}", detail.dimmed())?;
    } else {
        writeln!(w, "{}", detail)?;
    }
    writeln!(w)?;
    Ok(())
}

/// Print a real-time progress event.
pub fn print_progress(
    w: &mut dyn Write,
    event: &ProgressEvent,
    print_summaries: bool,
    color: ColorMode,
) -> std::io::Result<()> {
    match event {
        ProgressEvent::Discovered { total } => {
            if *total == 0 {
                writeln!(w, "No PDF files found.")?;
            } else {
                writeln!(w, "Found {} PDF files", total)?;
            }
        }
        ProgressEvent::Started { .. } => {
            // Shown as the progress bar message
        }
        ProgressEvent::Succeeded {
            index,
            total,
            file,
            id,
            summary,
            replaced,
            ..
        } => {
            let idx = index + 1;
            let note = if *replaced { " [overwrote existing]" } else { "" };
            if color.enabled() {
                writeln!(
                    w,
                    "[{}/{}] -> {} {} ({}){}",
                    idx,
                    total,
                    "DONE".green(),
                    file,
                    id.dimmed(),
                    note.yellow()
                )?;
            } else {
                writeln!(w, "[{}/{}] -> DONE {} ({}){}", idx, total, file, id, note)?;
            }
            if print_summaries {
                writeln!(w)?;
                let heading = format!("--- Summary {} ---", file);
                if color.enabled() {
                    writeln!(w, "{}", heading.bold())?;
                } else {
                    writeln!(w, "{}", heading)?;
                }
                writeln!(w, "{}", summary)?;
                writeln!(w)?;
            }
        }
        ProgressEvent::Failed {
            index,
            total,
            file,
            kind,
            message,
        } => {
            let idx = index + 1;
            if color.enabled() {
                writeln!(
                    w,
                    "[{}/{}] -> {} {} ({} error: {})",
                    idx,
                    total,
                    "FAILED".red(),
                    file,
                    kind,
                    message
                )?;
            } else {
                writeln!(
                    w,
                    "[{}/{}] -> FAILED {} ({} error: {})",
                    idx, total, file, kind, message
                )?;
            }
        }
    }
    Ok(())
}

/// Print the end-of-run summary, listing every failed item.
pub fn print_report(w: &mut dyn Write, report: &BatchReport, color: ColorMode) -> std::io::Result<()> {
    writeln!(w)?;
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold())?;
        writeln!(w, "{}", "SUMMARY".bold())?;
        writeln!(w, "{}", sep.bold())?;
    } else {
        writeln!(w, "{}", sep)?;
        writeln!(w, "SUMMARY")?;
        writeln!(w, "{}", sep)?;
    }

    writeln!(w, "  Papers attempted: {}", report.total())?;
    if let Some(run) = &report.run {
        writeln!(w, "  Output: {}", run.output_dir().display())?;
    }
    writeln!(w)?;

    if color.enabled() {
        writeln!(w, "  {} {}", "Summarized:".green(), report.succeeded())?;
    } else {
        writeln!(w, "  Summarized: {}", report.succeeded())?;
    }
    let replaced = report.successes.iter().filter(|s| s.replaced).count();
    if replaced > 0 {
        if color.enabled() {
            writeln!(w, "  {} {}", "Overwrote existing summaries:".yellow(), replaced)?;
        } else {
            writeln!(w, "  Overwrote existing summaries: {}", replaced)?;
        }
    }
    if report.failed() > 0 {
        if color.enabled() {
            writeln!(w, "  {} {}", "Failed:".red(), report.failed())?;
        } else {
            writeln!(w, "  Failed: {}", report.failed())?;
        }
        for failure in &report.failures {
            let line = format!("    {} ({}): {}", failure.file, failure.kind, failure.message);
            if color.enabled() {
                writeln!(w, "{}", line.red())?;
            } else {
                writeln!(w, "{}", line)?;
            }
        }
        writeln!(w)?;
        writeln!(w, "  Failed papers were left in place; re-run to retry them.")?;
    }

    writeln!(w)?;
    Ok(())
}

/// List what a real run would process.
pub fn print_dry_run(
    w: &mut dyn Write,
    papers: &Path,
    sources: &[SourceDocument],
    model: &ModelConfig,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(
            w,
            "{} {} ({} PDF files, model {})\n",
            "DRY RUN:".bold().cyan(),
            papers.display().bold(),
            sources.len(),
            model.model_name()
        )?;
    } else {
        writeln!(
            w,
            "DRY RUN: {} ({} PDF files, model {})\n",
            papers.display(),
            sources.len(),
            model.model_name()
        )?;
    }

    for (i, source) in sources.iter().enumerate() {
        if color.enabled() {
            writeln!(w, "{}", format!("[{}]", i + 1).bold().yellow())?;
        } else {
            writeln!(w, "[{}]", i + 1)?;
        }
        writeln!(w, "  File:     {}", source.display_name)?;
        match source.name() {
            Some(name) => writeln!(w, "  Artifact: {}", generate_id(name).file_name())?,
            None => writeln!(w, "  Artifact: none (filename is not valid UTF-8, will fail)")?,
        }
    }

    writeln!(w)?;
    writeln!(w, "Total: {} PDF files", sources.len())?;
    Ok(())
}
