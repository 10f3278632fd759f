use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use camt053_downgrade::{
    validate_document, BatchReport, CopyMode, FileReport, ReportFormat, TargetVersion,
    TransformOptions, TransformationEngine, TransformationReporter, XmlDocument,
};

#[derive(Parser, Debug)]
#[command(name = "camt053-downgrade")]
#[command(about = "Convert camt.053.001.10 bank statements to version 08 or 04 with bexio import fixes")]
struct Args {
    /// Input camt.053.001.10 XML files
    #[arg(required = true, value_name = "FILE")]
    inputs: Vec<PathBuf>,

    /// Target camt.053 version (4 or 8)
    #[arg(long, default_value = "8", value_name = "VERSION", value_parser = TargetVersion::parse)]
    target: TargetVersion,

    /// Explicit output file, allowed with a single input only
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// Directory for derived output file names (created if missing)
    #[arg(long, value_name = "DIR")]
    outdir: Option<PathBuf>,

    /// Copy the proprietary bank code into AddtlNtryInf when the field is
    /// missing, empty or a placeholder
    #[arg(long)]
    copy_prtry_to_addtlinf: bool,

    /// Append the proprietary code when AddtlNtryInf already has other content
    #[arg(long)]
    append_prtry: bool,

    /// AddtlNtryInf content treated as empty (repeatable, case-insensitive)
    #[arg(long = "empty-marker", value_name = "MARKER")]
    empty_markers: Vec<String>,

    /// Separator used when appending the proprietary code
    #[arg(long, default_value = " | ", value_name = "SEP")]
    separator: String,

    /// Check the transformed documents against the target structure
    #[arg(long)]
    validate: bool,

    /// Report format (console or json)
    #[arg(long, default_value = "console", value_name = "FORMAT", value_parser = ReportFormat::parse)]
    report: ReportFormat,
}

fn main() {
    let args = Args::parse();
    process::exit(run(args));
}

fn run(args: Args) -> i32 {
    let inputs: Vec<PathBuf> = args
        .inputs
        .iter()
        .filter(|path| path.is_file())
        .cloned()
        .collect();
    if inputs.is_empty() {
        eprintln!("No input files found.");
        return 2;
    }
    if args.out.is_some() && inputs.len() != 1 {
        eprintln!("--out can only be used with a single input file.");
        return 2;
    }
    if let Some(dir) = &args.outdir {
        if let Err(error) = fs::create_dir_all(dir) {
            eprintln!("Cannot create output directory {}: {error}", dir.display());
            return 2;
        }
    }

    let mut options = TransformOptions::new(args.target)
        .with_copy_mode(resolve_copy_mode(
            args.copy_prtry_to_addtlinf,
            args.append_prtry,
        ))
        .with_separator(args.separator.clone());
    if !args.empty_markers.is_empty() {
        options = options.with_empty_markers(args.empty_markers.clone());
    }
    let engine = TransformationEngine::new(options);
    let reporter = TransformationReporter::new().with_format(args.report);

    let mut file_reports = Vec::new();
    for input in &inputs {
        let output = output_path(input, args.out.as_deref(), args.outdir.as_deref(), args.target);
        let report = match process_file(&engine, input, &output, args.validate) {
            Ok(report) => report,
            Err(reason) => FileReport::failure(input.display().to_string(), reason),
        };
        if args.report == ReportFormat::Console {
            let line = reporter.format_file_line(&report);
            if report.succeeded() {
                println!("{line}");
            } else {
                eprintln!("{line}");
            }
        }
        file_reports.push(report);
    }

    let batch = BatchReport::new(args.target.to_string(), file_reports);
    if args.report == ReportFormat::Json {
        match reporter.format_report(&batch) {
            Ok(text) => println!("{text}"),
            Err(error) => {
                eprintln!("{error}");
                return 1;
            }
        }
    }

    if batch.failed == 0 {
        0
    } else {
        1
    }
}

fn resolve_copy_mode(copy_to_addtl_inf: bool, append: bool) -> CopyMode {
    if !copy_to_addtl_inf {
        CopyMode::Off
    } else if append {
        CopyMode::Append
    } else {
        CopyMode::Replace
    }
}

/// Process one file end to end. The output file is only written after the
/// whole in-memory transformation succeeded, so a failing input never
/// leaves partial output behind.
fn process_file(
    engine: &TransformationEngine,
    input: &Path,
    output: &Path,
    validate: bool,
) -> Result<FileReport, String> {
    let bytes = fs::read(input).map_err(|error| format!("cannot read file: {error}"))?;
    let mut document = XmlDocument::parse(&bytes).map_err(|error| error.to_string())?;
    let result = engine
        .transform(&mut document)
        .map_err(|error| error.to_string())?;
    let output_bytes = document.to_bytes().map_err(|error| error.to_string())?;
    fs::write(output, output_bytes)
        .map_err(|error| format!("cannot write {}: {error}", output.display()))?;

    let validation = if validate {
        Some(validate_document(&document, engine.target()))
    } else {
        None
    };

    Ok(FileReport::success(
        input.display().to_string(),
        output.display().to_string(),
        result.summary,
        validation.as_ref(),
    ))
}

fn output_path(
    input: &Path,
    out: Option<&Path>,
    outdir: Option<&Path>,
    target: TargetVersion,
) -> PathBuf {
    if let Some(out) = out {
        return out.to_path_buf();
    }
    let derived = default_output_path(input, target);
    match outdir {
        Some(dir) => match derived.file_name() {
            Some(name) => dir.join(name),
            None => derived,
        },
        None => derived,
    }
}

fn default_output_path(input: &Path, target: TargetVersion) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "statement".to_string());
    input.with_file_name(format!("{stem}_camt053_v{target}_bexio.xml"))
}
