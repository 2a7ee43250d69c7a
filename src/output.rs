use std::fs::File;
use std::io::{self, Write, BufWriter};
use std::path::PathBuf;
use anyhow::Result;
use colored::*;

use crate::cli::OutputFormat;
use crate::probes::ProbeReport;

pub struct OutputWriter {
    format: OutputFormat,
    file: Option<PathBuf>,
}

impl OutputWriter {
    pub fn new(format: OutputFormat, file: Option<PathBuf>) -> Result<Self> {
        Ok(Self { format, file })
    }

    pub fn write(&self, reports: &[ProbeReport]) -> Result<()> {
        let output = match self.format {
            OutputFormat::Human => self.format_human(reports),
            OutputFormat::Json => self.format_json(reports)?,
        };

        match &self.file {
            Some(path) => {
                let file = File::create(path)?;
                let mut writer = BufWriter::new(file);
                writer.write_all(output.as_bytes())?;
                writer.flush()?;
            }
            None => {
                print!("{}", output);
                io::stdout().flush()?;
            }
        }

        Ok(())
    }

    pub fn format_human(&self, reports: &[ProbeReport]) -> String {
        let mut output = String::new();

        for report in reports {
            let status = if report.success {
                "PASS".truecolor(0, 255, 65).bold()
            } else {
                "FAIL".truecolor(255, 64, 64).bold()
            };

            output.push_str(&format!("{} {} {} {}\n",
                status,
                report.protocol.truecolor(255, 140, 0).bold(),
                report.target.truecolor(255, 255, 255).bold(),
                format!("({}ms)", report.duration_ms).truecolor(128, 128, 128)));

            if let (Some(kind), Some(message)) = (&report.kind, &report.message) {
                output.push_str(&format!("  {} {}\n",
                    format!("[{}]", kind).truecolor(0, 212, 255),
                    message.truecolor(128, 128, 128)));
            }
        }

        let failed = reports.iter().filter(|r| !r.success).count();
        output.push_str(&format!("\n{} passed, {} failed\n",
            reports.len() - failed, failed));

        output
    }

    pub fn format_json(&self, reports: &[ProbeReport]) -> Result<String> {
        let mut json = serde_json::to_string_pretty(reports)?;
        json.push('\n');
        Ok(json)
    }
}
