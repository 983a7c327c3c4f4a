use clap::{Parser, ValueEnum};
use ihexlib::{DEFAULT_PAYLOAD_SIZE, HexFormat, IntelHex, ParseOptions};
use log::debug;
use std::path::{Path, PathBuf};
use std::process;

/// Output sub-format accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TargetFormat {
    #[value(name = "I16")]
    I16,
    #[value(name = "I32")]
    I32,
}

impl From<TargetFormat> for HexFormat {
    fn from(value: TargetFormat) -> Self {
        match value {
            TargetFormat::I16 => Self::I16,
            TargetFormat::I32 => Self::I32,
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about = "Intel HEX file parser / writer", long_about = None)]
struct Args {
    /// File to read
    input: PathBuf,
    /// Output to file specified
    #[arg(short, long)]
    output: PathBuf,
    /// Type of hex format for output file
    #[arg(short, long, value_enum, ignore_case = true)]
    type_output: TargetFormat,
    /// Fail on illegal record types and duplicate start addresses instead of warning
    #[arg(long)]
    strict: bool,
    /// Max data bytes per record
    #[arg(long, default_value_t = DEFAULT_PAYLOAD_SIZE)]
    payload_size: u8,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let target = HexFormat::from(args.type_output);

    // Guard: input must be an existing file
    if !args.input.is_file() {
        return Err(format!("{} is not a valid filepath", args.input.display()).into());
    }

    // Guard: output directory must exist
    let out_dir = output_dir(&args.output);
    if !out_dir.is_dir() {
        return Err(format!("{} isn't a valid directory path", out_dir.display()).into());
    }

    let options = ParseOptions::new(HexFormat::Auto, args.strict);
    let (ih, detected) = IntelHex::from_hex(&args.input, &options)?;
    println!(" - File parsed successfully: {}", args.input.display());
    debug!(
        "{} bytes in {} range(s), detected format {detected}",
        ih.size(),
        ih.ranges().len()
    );

    if detected == target {
        return Err(format!(
            "{} is already in the requested format ({target})",
            args.input.display()
        )
        .into());
    }

    println!(
        " - Writing {} -> {} (format {target})",
        args.input.display(),
        args.output.display()
    );
    ih.write_hex_file(&args.output, target, args.payload_size)?;
    println!(" - File written successfully: {}", args.output.display());
    Ok(())
}

/// Directory the output file lands in; a bare file name means the working directory.
fn output_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
