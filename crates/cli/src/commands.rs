use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Curate one bronze batch as described by a YAML config
    Curate {
        #[arg(long, help = "Config file path")]
        config: String,

        #[arg(
            long,
            help = "Curate without saving watermarks or writing output and quarantine files"
        )]
        dry_run: bool,

        #[arg(
            long,
            help = "If specified, writes the JSON report to this file instead of stdout"
        )]
        report: Option<String>,
    },
    /// Load and validate a config without running it
    Validate {
        #[arg(long, help = "Config file path")]
        config: String,
    },
    /// Inspect or edit stored watermarks
    Watermark {
        #[arg(long, global = true, help = "State directory (defaults to ~/.medallion/state)")]
        state_dir: Option<String>,

        #[arg(long, global = true, default_value = "file", help = "State backend: file or sled")]
        backend: String,

        #[command(subcommand)]
        command: WatermarkCommand,
    },
    /// Report rows of a CSV file older than a watermark
    Late {
        #[arg(long, help = "CSV file to inspect")]
        input: String,

        #[arg(long, help = "Event timestamp column")]
        ts_column: String,

        #[arg(long, help = "Watermark value to compare against")]
        watermark: Option<String>,

        #[arg(long, help = "Type of the timestamp column, e.g. timestamp or int")]
        ts_type: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum WatermarkCommand {
    Get {
        #[arg(long)]
        system: String,
        #[arg(long)]
        entity: String,
    },
    Set {
        #[arg(long)]
        system: String,
        #[arg(long)]
        entity: String,
        #[arg(long)]
        value: String,
    },
    Delete {
        #[arg(long)]
        system: String,
        #[arg(long)]
        entity: String,
    },
    List {
        #[arg(long, help = "Print as JSON instead of a table")]
        json: bool,
    },
    /// Hours since the watermark was last saved
    Age {
        #[arg(long)]
        system: String,
        #[arg(long)]
        entity: String,
    },
}
