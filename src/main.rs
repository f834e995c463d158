use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dialoguer::Confirm;
use imgsweep::actions::delete_flagged;
use imgsweep::core::blur::UnreadablePolicy;
use imgsweep::core::duplicate::DuplicatePolicy;
use imgsweep::core::face::{CroppedFaceEncoder, FaceEncoder, SeetaFaceEncoder};
use imgsweep::core::image::Status;
use imgsweep::core::stale::parse_cutoff;
use imgsweep::history::{self, Action, HistoryRecord};
use imgsweep::{Config, Criterion, FaceReport, Outcome, ScanReport, Summary, Sweeper, logging};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "imgsweep", version, about = "CLI for sweeping unwanted photos out of a folder")]
struct Cli {
    /// TOML config file; flags override its values
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find perceptual duplicates; the first copy in name order is kept
    Duplicates {
        /// Directory to scan
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,
        /// Treat hashes closer than N bits as duplicates (default: exact match)
        #[arg(long, value_name = "N")]
        distance: Option<u32>,
        #[command(flatten)]
        sweep: SweepArgs,
    },

    /// Find blurry images by Laplacian variance
    Blur {
        /// Directory to scan
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,
        /// Variance below which an image is blurry
        #[arg(long)]
        threshold: Option<f64>,
        /// Count images that fail to decode as blurry
        #[arg(long)]
        flag_unreadable: bool,
        #[command(flatten)]
        sweep: SweepArgs,
    },

    /// Find images last modified before a cutoff
    Stale {
        /// Directory to scan
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,
        /// Cutoff in local time, "YYYY-MM-DD HH:MM:SS"
        #[arg(long, value_name = "TIME")]
        before: String,
        #[command(flatten)]
        sweep: SweepArgs,
    },

    /// Copy images showing the reference face into an output folder
    Faces {
        /// Directory to scan
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,
        /// Image containing the face to look for
        #[arg(short, long, value_name = "IMAGE")]
        reference: PathBuf,
        /// Face distance below which two faces match
        #[arg(long)]
        tolerance: Option<f64>,
        /// Folder for matches (default: `<dir>/matched_images`)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
        /// SeetaFace frontal detector model file
        #[arg(long, value_name = "FILE", conflicts_with = "cropped")]
        model: Option<PathBuf>,
        /// Images are already cropped to one face; skip detection
        #[arg(long)]
        cropped: bool,
        /// Only show what would be copied
        #[arg(long)]
        dry_run: bool,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run duplicate, blur and staleness checks together
    Analyze {
        /// Directory to scan
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,
        /// Cutoff in local time (default: `stale_after_days` ago)
        #[arg(long, value_name = "TIME")]
        before: Option<String>,
        /// Treat hashes closer than N bits as duplicates
        #[arg(long, value_name = "N")]
        distance: Option<u32>,
        /// Variance below which an image is blurry
        #[arg(long)]
        threshold: Option<f64>,
        #[command(flatten)]
        sweep: SweepArgs,
    },

    /// Work with the sweep history
    History {
        #[command(subcommand)]
        command: HistoryCmd,
    },
}

#[derive(Args, Debug)]
struct SweepArgs {
    /// Delete flagged images
    #[arg(long)]
    delete: bool,
    /// Only show what would be deleted
    #[arg(long)]
    dry_run: bool,
    /// Do not ask before deleting
    #[arg(short, long)]
    yes: bool,
    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum HistoryCmd {
    /// List all sweep history records
    List {
        /// Directory that was swept
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Duplicates {
            path,
            distance,
            sweep,
        } => {
            let policy = distance
                .map(|below| DuplicatePolicy::Hamming { below })
                .unwrap_or(config.duplicates);
            config.duplicates = policy;
            config.validate()?;

            if !sweep.json {
                println!("▶ Scanning for duplicates in: {}", path.display());
            }
            let mut report = sweeper(config, &sweep).find_duplicates(&path, policy)?;
            finish(&mut report, &sweep)?;
        }

        Commands::Blur {
            path,
            threshold,
            flag_unreadable,
            sweep,
        } => {
            if let Some(threshold) = threshold {
                config.blur_threshold = threshold;
            }
            if flag_unreadable {
                config.unreadable = UnreadablePolicy::Flag;
            }
            config.validate()?;

            if !sweep.json {
                println!(
                    "▶ Scanning for blurry images in: {} (threshold {})",
                    path.display(),
                    config.blur_threshold
                );
            }
            let mut report = sweeper(config, &sweep).scan_for_blur(&path)?;
            finish(&mut report, &sweep)?;
        }

        Commands::Stale {
            path,
            before,
            sweep,
        } => {
            let cutoff = parse_cutoff(&before)?;
            if !sweep.json {
                println!("▶ Scanning for images older than {} in: {}", before, path.display());
            }
            let mut report = sweeper(config, &sweep).scan_for_stale(&path, cutoff)?;
            finish(&mut report, &sweep)?;
        }

        Commands::Analyze {
            path,
            before,
            distance,
            threshold,
            sweep,
        } => {
            let cutoff = before.as_deref().map(parse_cutoff).transpose()?;
            if let Some(below) = distance {
                config.analyze_duplicates = DuplicatePolicy::Hamming { below };
            }
            if let Some(threshold) = threshold {
                config.blur_threshold = threshold;
            }
            config.validate()?;

            if !sweep.json {
                println!("▶ Analyzing images in: {}", path.display());
            }
            let mut report = sweeper(config, &sweep).analyze(&path, cutoff)?;
            finish(&mut report, &sweep)?;
        }

        Commands::Faces {
            path,
            reference,
            tolerance,
            output,
            model,
            cropped,
            dry_run,
            json,
        } => {
            if let Some(tolerance) = tolerance {
                config.tolerance = tolerance;
            }
            if let Some(output) = output {
                config.output_folder = output;
            }
            if model.is_some() {
                config.face_model = model;
            }
            config.validate()?;

            let mut encoder: Box<dyn FaceEncoder> = if cropped {
                Box::new(CroppedFaceEncoder)
            } else {
                let model = config.face_model.as_deref().context(
                    "No face model configured; pass --model FILE or --cropped",
                )?;
                Box::new(SeetaFaceEncoder::from_model(model)?)
            };

            if !json {
                println!(
                    "▶ Looking for {} in: {}",
                    reference.display(),
                    path.display()
                );
            }
            let sweeper = Sweeper::new(config).with_progress(!json);
            let report = sweeper.match_faces(&path, &reference, encoder.as_mut(), dry_run)?;
            report_faces(&report, dry_run, json)?;
        }

        Commands::History { command } => match command {
            HistoryCmd::List { path } => {
                let records = history::read(&path)?;
                if records.is_empty() {
                    println!("No sweep history in {}", path.display());
                    return Ok(());
                }

                println!("🗂️  Sweep History:");
                for (i, rec) in records.iter().enumerate() {
                    println!(
                        "[{}] {}\n     {:?} ({})\n     done: {:?}\n     failed: {:?}\n",
                        i, rec.timestamp, rec.action, rec.criterion, rec.done, rec.failed
                    );
                }
            }
        },
    }

    Ok(())
}

fn sweeper(config: Config, sweep: &SweepArgs) -> Sweeper {
    Sweeper::new(config).with_progress(!sweep.json)
}

/// Print the report, delete flagged files if asked, and journal the result.
fn finish(report: &mut ScanReport, sweep: &SweepArgs) -> Result<()> {
    if !sweep.json {
        print_records(report);
    }

    let flagged = report.flagged().count();
    if sweep.delete && flagged > 0 {
        let go_ahead = sweep.dry_run
            || sweep.yes
            || Confirm::new()
                .with_prompt(format!(
                    "Delete {} {} image(s)? This cannot be undone.",
                    flagged, report.criterion
                ))
                .default(false)
                .interact()
                .context("Failed to read confirmation")?;

        if go_ahead {
            delete_flagged(&mut report.records, sweep.dry_run);
            if !sweep.dry_run {
                journal_deletions(report)?;
            }
        } else {
            log::info!("Deletion declined; nothing deleted");
            if !sweep.json {
                println!("Nothing deleted.");
            }
        }
    }

    if sweep.json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print_summary(&report.summary(), report.criterion, sweep.dry_run);
    }
    Ok(())
}

fn print_records(report: &ScanReport) {
    if report.records.is_empty() {
        println!("No images found.");
        return;
    }
    for record in report.flagged() {
        let mut reasons = Vec::new();
        if record.is_duplicate {
            match &record.duplicate_of {
                Some(original) => reasons.push(format!("duplicate of {}", display_name(original))),
                None => reasons.push("duplicate".to_string()),
            }
        }
        if record.is_blurry {
            match record.sharpness {
                Some(score) => reasons.push(format!("blurry ({:.1})", score)),
                None => reasons.push("unreadable".to_string()),
            }
        }
        if record.is_stale {
            if let Some(modified) = record.last_modified {
                reasons.push(format!("stale ({})", modified.format("%Y-%m-%d %H:%M:%S")));
            }
        }
        println!("   ▶ {} [{}]", record.file_name(), reasons.join(", "));
    }
    for record in report.records.iter().filter(|r| r.unreadable && !r.is_flagged()) {
        eprintln!("⚠️  Could not read {}", record.path.display());
    }
}

fn print_summary(summary: &Summary, criterion: Criterion, dry_run: bool) {
    println!(
        "\nScanned {}, {} {}, {} deleted, {} failed",
        summary.scanned, summary.flagged, criterion, summary.handled, summary.failed
    );
    match summary.outcome() {
        Outcome::NothingFound => println!("No {} images found.", criterion),
        Outcome::Success if dry_run => println!("⚠️  Dry-run only; no files were changed."),
        Outcome::Success => println!("✅ Done."),
        Outcome::PartialSuccess => {
            println!("⚠️  Some files could not be removed (see warnings above).")
        }
    }
}

fn journal_deletions(report: &ScanReport) -> Result<()> {
    let done: Vec<String> = report
        .records
        .iter()
        .filter(|r| r.status == Status::Deleted)
        .map(|r| r.path.to_string_lossy().into_owned())
        .collect();
    let failed: Vec<String> = report
        .records
        .iter()
        .filter(|r| r.side_effect_failed())
        .map(|r| r.path.to_string_lossy().into_owned())
        .collect();
    if done.is_empty() && failed.is_empty() {
        return Ok(());
    }

    let record = HistoryRecord::new(Action::Deleted, report.criterion, done, failed);
    history::append(&report.folder, &record)?;
    log::info!(
        "Recorded sweep history in {}",
        history::history_path(&report.folder).display()
    );
    Ok(())
}

fn report_faces(report: &FaceReport, dry_run: bool, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        for record in report.records.iter().filter(|r| r.matched) {
            match (&record.copied_to, record.distance) {
                (Some(dest), Some(d)) => {
                    println!("   📦 {} → {} (distance {:.3})", display_name(&record.path), dest.display(), d)
                }
                (_, Some(d)) if dry_run => println!(
                    "   📦 [dry-run] COPY {} → {} (distance {:.3})",
                    display_name(&record.path),
                    report.output_folder.display(),
                    d
                ),
                _ => println!("   ⚠️  {} matched but was not copied", display_name(&record.path)),
            }
        }
    }

    if !dry_run {
        journal_copies(report)?;
    }

    if !json {
        let summary = report.summary();
        match summary.outcome() {
            Outcome::NothingFound => println!("No images were found that match the reference."),
            Outcome::Success if dry_run => println!("⚠️  Dry-run only; no files were changed."),
            Outcome::Success => println!(
                "✅ Copied {} matching image(s) to {}",
                summary.handled,
                report.output_folder.display()
            ),
            Outcome::PartialSuccess => println!(
                "⚠️  Copied {} of {} matching image(s); see warnings above.",
                summary.handled, summary.flagged
            ),
        }
    }
    Ok(())
}

fn journal_copies(report: &FaceReport) -> Result<()> {
    let copied: Vec<String> = report
        .records
        .iter()
        .filter(|r| r.status == Status::Copied)
        .map(|r| r.path.to_string_lossy().into_owned())
        .collect();
    let failed: Vec<String> = report
        .records
        .iter()
        .filter(|r| r.matched && r.status == Status::Flagged)
        .map(|r| r.path.to_string_lossy().into_owned())
        .collect();
    if copied.is_empty() && failed.is_empty() {
        return Ok(());
    }

    history::append(
        &report.folder,
        &HistoryRecord::new(Action::Copied, Criterion::Faces, copied, failed),
    )?;
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}
