//! Rendering of command results on stdout.

use std::io::Write;

use serde::Serialize;
use unlurk_core::{ActiveResponse, TreeRow};

use super::args::OutputFormat;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

pub fn print_active(response: &ActiveResponse, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(response),
        OutputFormat::Text => {
            let mut stdout = std::io::stdout().lock();
            if response.second_chance_failed {
                writeln!(stdout, "(front page unavailable; promoted stories may be missing)")?;
            }
            for row in &response.rows {
                let marker = match (row.active, row.second_chance) {
                    (_, true) => "^",
                    (true, false) => "*",
                    (false, false) => " ",
                };
                writeln!(
                    stdout,
                    "{}{} {:>4} {}{}",
                    "  ".repeat(row.depth),
                    marker,
                    row.age,
                    author_prefix(&row.by),
                    row.text
                )?;
            }
            Ok(())
        }
    }
}

pub fn print_tree(rows: &[TreeRow], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Text => {
            let mut stdout = std::io::stdout().lock();
            for row in rows {
                writeln!(
                    stdout,
                    "{}{} {}{}",
                    "  ".repeat(row.depth),
                    row.id,
                    author_prefix(&row.by),
                    row.text
                )?;
            }
            Ok(())
        }
    }
}

fn author_prefix(by: &str) -> String {
    if by.is_empty() {
        String::new()
    } else {
        format!("{by}: ")
    }
}
