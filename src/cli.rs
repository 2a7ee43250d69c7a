use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "healthprobe")]
#[command(author = "HealthProbe")]
#[command(version = "0.1.0")]
#[command(about = "Run protocol health checks against network services", long_about = None)]
pub struct Cli {
    #[arg(help = "Hostnames or IP addresses to probe. IPv6 literals are given bare, e.g. ::1")]
    pub target: Vec<String>,

    #[arg(short = 'p', long, help = "Protocol check to run (see --list)")]
    pub protocol: Option<String>,

    #[arg(
        short = 'l',
        long,
        default_value = "",
        help = "Instruction line with options, e.g. \"with port 2525 and tls insecure\""
    )]
    pub line: String,

    #[arg(
        short = 't',
        long,
        default_value_t = 10000,
        help = "Give up on a target after this many milliseconds"
    )]
    pub timeout: u64,

    #[arg(short = 'o', long, value_enum, default_value = "human", help = "Output format")]
    pub output_format: OutputFormat,

    #[arg(short = 'f', long, help = "Output file path")]
    pub output_file: Option<PathBuf>,

    #[arg(long, help = "List available protocol checks and their usage")]
    pub list: bool,

    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum OutputFormat {
    #[value(name = "human", help = "Human-readable output")]
    Human,
    #[value(name = "json", help = "JSON output")]
    Json,
}
