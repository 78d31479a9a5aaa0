use clap::{Parser, Subcommand};
use qr_batch::config::{self, RunConfig};
use qr_batch::process::{self, RowEvent};
use qr_batch::redact::redact_if;
use qr_batch::output;
use qr_batch::types::{ErrorCorrection, ManifestFormat, OutputFormat, SheetSelector};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Flags shared by `generate` and `check`. Each one overrides the matching
/// config file value only when given.
#[derive(clap::Args, Clone, Debug, Default)]
struct RunArgs {
    /// Input file (.xlsx, .xls, .csv or .json)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output folder for generated images
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Sheet to read: 0-based index or sheet name
    #[arg(short, long)]
    sheet: Option<SheetSelector>,

    /// Prefix phone numbers with "+" when missing
    #[arg(long, overrides_with = "no_keep_plus")]
    keep_plus: bool,

    /// Use phone numbers as written
    #[arg(long, overrides_with = "keep_plus")]
    no_keep_plus: bool,

    /// Replace images that already exist
    #[arg(long)]
    overwrite: bool,

    /// Skip rows whose phone number was already seen
    #[arg(long)]
    dedup: bool,

    /// QR foreground color (#rgb, #rrggbb or a color name)
    #[arg(long)]
    fill_color: Option<String>,

    /// QR background color
    #[arg(long)]
    back_color: Option<String>,

    /// Pixels (or points) per module
    #[arg(long)]
    box_size: Option<u32>,

    /// Quiet zone width in modules
    #[arg(long)]
    border: Option<u32>,

    #[arg(long, value_enum)]
    error_correction: Option<ErrorCorrection>,

    /// Payload format: phone, vcard, mecard, wifi, url, sms or email
    #[arg(long)]
    payload_format: Option<String>,

    #[arg(long, value_enum)]
    output_format: Option<OutputFormat>,

    /// Filename template, e.g. "{Name}_{Phone}"
    #[arg(long)]
    filename_template: Option<String>,

    /// Write images here and refuse any path outside it
    #[arg(long)]
    allowed_output_path: Option<PathBuf>,

    #[arg(long)]
    max_file_size_mb: Option<u64>,

    #[arg(long)]
    max_rows: Option<usize>,

    /// Mask phone numbers and emails in log output
    #[arg(long, overrides_with = "no_redact_logs")]
    redact_logs: bool,

    /// Log phone numbers and emails unmasked
    #[arg(long, overrides_with = "redact_logs")]
    no_redact_logs: bool,

    /// Walk every row without writing any file
    #[arg(long)]
    dry_run: bool,

    /// Write a manifest of generated images
    #[arg(long)]
    export_manifest: bool,

    #[arg(long, value_enum)]
    manifest_format: Option<ManifestFormat>,
}

fn flag_pair(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

impl RunArgs {
    fn apply(&self, config: &mut RunConfig) {
        if let Some(path) = &self.input {
            config.input.path = path.clone();
        }
        if let Some(sheet) = &self.sheet {
            config.input.sheet = sheet.clone();
        }
        if let Some(mb) = self.max_file_size_mb {
            config.input.max_file_size_mb = mb;
        }
        if let Some(rows) = self.max_rows {
            config.input.max_rows = rows;
        }

        if let Some(folder) = &self.output {
            config.output.folder = folder.clone();
        }
        if let Some(format) = self.output_format {
            config.output.format = format;
        }
        if let Some(template) = &self.filename_template {
            config.output.filename_template = template.clone();
        }
        if let Some(root) = &self.allowed_output_path {
            config.output.allowed_root = Some(root.clone());
        }
        config.output.overwrite |= self.overwrite;
        config.output.dry_run |= self.dry_run;

        if let Some(format) = &self.payload_format {
            config.payload.format = format.clone();
        }
        if let Some(keep) = flag_pair(self.keep_plus, self.no_keep_plus) {
            config.payload.keep_plus = keep;
        }
        config.payload.dedup |= self.dedup;

        if let Some(color) = &self.fill_color {
            config.qr.fill_color = color.clone();
        }
        if let Some(color) = &self.back_color {
            config.qr.back_color = color.clone();
        }
        if let Some(size) = self.box_size {
            config.qr.box_size = size;
        }
        if let Some(border) = self.border {
            config.qr.border = border;
        }
        if let Some(level) = self.error_correction {
            config.qr.error_correction = level;
        }

        config.manifest.enabled |= self.export_manifest;
        if let Some(format) = self.manifest_format {
            config.manifest.format = format;
        }

        if let Some(redact) = flag_pair(self.redact_logs, self.no_redact_logs) {
            config.logging.redact_pii = redact;
        }
    }
}

#[derive(Parser)]
#[command(name = "qr-batch")]
#[command(about = "Batch QR code generator for contact spreadsheets")]
#[command(long_about = "\
Batch QR code generator for contact spreadsheets

Every row of the input becomes one QR image. The sheet always needs a
'Phone' column. Columns read per payload format (optional in brackets):

  phone    Phone
  vcard    Phone [Name, Email, Organization]
  mecard   Phone [Name, Email]
  wifi     SSID [Password, Encryption, Hidden]
  url      URL
  sms      Phone [Message]
  email    Email [Subject, Body]

Filenames come from a template over column names, e.g. '{Name}_{Phone}'.
A missing column or an empty result falls back to the phone number.

Run 'qr-batch gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file (TOML). Flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate one QR image per row
    Generate(RunArgs),
    /// Validate the input and report bad rows without writing images
    Check(RunArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let args = match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return ExitCode::SUCCESS;
        }
        Command::Generate(ref args) | Command::Check(ref args) => args,
    };

    let config = match load(cli.config.as_deref(), args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Check(_) => check(&config),
        _ => generate(&config),
    }
}

fn load(path: Option<&std::path::Path>, args: &RunArgs) -> Result<RunConfig, config::ConfigError> {
    let mut config = config::load_config(path)?;
    args.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn generate(config: &RunConfig) -> ExitCode {
    let redact = config.logging.redact_pii;
    let (tx, rx) = std::sync::mpsc::channel::<RowEvent>();
    let printer = std::thread::spawn(move || {
        for event in rx {
            match &event {
                RowEvent::Finished(stats) => output::print_summary(stats, redact),
                _ => output::log_row_event(&event, redact),
            }
        }
    });

    let result = process::run(config, Some(tx));
    printer.join().ok();

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", redact_if(redact, &e.to_string()));
            ExitCode::FAILURE
        }
    }
}

fn check(config: &RunConfig) -> ExitCode {
    let redact = config.logging.redact_pii;
    match process::check(config) {
        Ok(result) => {
            output::print_check_report(&result, redact);
            if result.report.valid == 0 {
                tracing::error!("No valid rows found");
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            tracing::error!("{}", redact_if(redact, &e.to_string()));
            ExitCode::FAILURE
        }
    }
}
