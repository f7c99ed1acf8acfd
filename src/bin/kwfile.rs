use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kwfile::core::{ElementData, FileMode, KeywordReader, KeywordWriter, StreamConfig};
use kwfile::restart::RestartReader;
use kwfile::summary::SummaryCase;
use kwfile::tabular::{export_parquet, import_file};
use kwfile::NamedSeries;
use log::info;
use serde::Serialize;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime, Time};

#[derive(Parser)]
#[command(name = "kwfile", version, about = "Inspect and convert simulator keyword files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Formatted,
    Unformatted,
}

impl From<Mode> for FileMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Formatted => FileMode::Formatted,
            Mode::Unformatted => FileMode::Unformatted,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the keywords of any keyword file.
    Dump {
        path: PathBuf,
        /// Print the first values of each keyword.
        #[arg(long, default_value_t = 0)]
        values: usize,
    },
    /// List or extract summary vectors from a case header.
    Summary {
        header: PathBuf,
        /// Wildcard pattern such as `WOPR:*`.
        #[arg(long = "match")]
        pattern: Option<String>,
        /// Print values as well as names.
        #[arg(long)]
        extract: bool,
        #[arg(long)]
        json: bool,
    },
    /// List report steps or find the step at or after a date.
    Restart {
        path: PathBuf,
        /// Date as YYYY-MM-DD.
        #[arg(long)]
        date: Option<String>,
    },
    /// Rewrite a keyword file in the other encoding.
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Target encoding; defaults to the opposite of the input.
        #[arg(long, value_enum)]
        to: Option<Mode>,
    },
    /// Import a tabular, surface or well file.
    Import {
        path: PathBuf,
        /// Write the imported series to a parquet file.
        #[arg(long)]
        parquet: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct SeriesOut<'a> {
    name: &'a str,
    unit: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    timestamps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    values: Option<&'a [f64]>,
}

impl<'a> SeriesOut<'a> {
    fn new(series: &'a NamedSeries, with_values: bool) -> Self {
        Self {
            name: &series.name,
            unit: series.unit.as_deref(),
            timestamps: if with_values {
                series.timestamps.iter().map(ToString::to_string).collect()
            } else {
                Vec::new()
            },
            values: with_values.then_some(series.values.as_slice()),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut out = BufWriter::new(io::stdout());
    match cli.command {
        Commands::Dump { path, values } => cmd_dump(&path, values, &mut out)?,
        Commands::Summary {
            header,
            pattern,
            extract,
            json,
        } => cmd_summary(&header, pattern.as_deref(), extract, json, &mut out)?,
        Commands::Restart { path, date } => cmd_restart(&path, date.as_deref(), &mut out)?,
        Commands::Convert { input, output, to } => cmd_convert(&input, &output, to, &mut out)?,
        Commands::Import { path, parquet } => cmd_import(&path, parquet.as_deref(), &mut out)?,
    }
    out.flush()?;
    Ok(())
}

fn cmd_dump(path: &Path, values: usize, out: &mut dyn Write) -> Result<()> {
    let mut reader = KeywordReader::open(path).with_context(|| format!("open {}", path.display()))?;
    writeln!(out, "{} ({:?})", path.display(), reader.mode())?;
    loop {
        let offset = reader.position();
        let Some(record) = reader.next_record()? else {
            break;
        };
        write!(out, "{offset:>12}  {:<8} {:>10} {}", record.name(), record.count(), record.tag())?;
        if values > 0 {
            let shown = match record.values()? {
                ElementData::Char8(v) => v.into_iter().take(values).collect::<Vec<_>>().join(" "),
                ElementData::Message(text) => text,
                data => data
                    .to_f64_vec()
                    .unwrap_or_default()
                    .iter()
                    .take(values)
                    .map(|x| format!("{x}"))
                    .collect::<Vec<_>>()
                    .join(" "),
            };
            write!(out, "  {shown}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn cmd_summary(header: &Path, pattern: Option<&str>, extract: bool, json: bool, out: &mut dyn Write) -> Result<()> {
    let case = SummaryCase::open(header).with_context(|| format!("open summary case {}", header.display()))?;
    let index = case.index();
    info!(
        "{} slots, {} keys, {} duplicates, {} placeholders",
        index.len(),
        index.key_count(),
        index.duplicate_count(),
        index.invalid_count()
    );
    let series = case.matching(pattern.unwrap_or("*"))?;
    if json {
        let rows: Vec<SeriesOut<'_>> = series.iter().map(|s| SeriesOut::new(s, extract)).collect();
        serde_json::to_writer_pretty(&mut *out, &rows)?;
        writeln!(out)?;
        return Ok(());
    }
    for s in &series {
        let unit = s.unit.as_deref().unwrap_or("");
        if extract {
            let values: Vec<String> = s.values.iter().map(|v| format!("{v}")).collect();
            writeln!(out, "{} [{unit}] {}", s.name, values.join(" "))?;
        } else {
            writeln!(out, "{} [{unit}]", s.name)?;
        }
    }
    Ok(())
}

fn parse_date(text: &str) -> Result<PrimitiveDateTime> {
    let date = Date::parse(text, format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("invalid date {text:?}, expected YYYY-MM-DD"))?;
    Ok(PrimitiveDateTime::new(date, Time::MIDNIGHT))
}

fn cmd_restart(path: &Path, date: Option<&str>, out: &mut dyn Write) -> Result<()> {
    let mut reader = RestartReader::open(path).with_context(|| format!("open restart {}", path.display()))?;
    match date {
        Some(date) => {
            let time = parse_date(date)?;
            match reader.get_step_at_or_after(time)? {
                Some(idx) => {
                    let block = reader.read_block(idx)?;
                    writeln!(out, "{idx} step={} time={} days={}", block.step, block.sim_time, block.sim_days)?;
                }
                None => writeln!(out, "no step at or after {time}")?,
            }
        }
        None => {
            for (idx, entry) in reader.steps()?.iter().enumerate() {
                writeln!(
                    out,
                    "{idx:>5} step={:<5} time={} days={} offset={}",
                    entry.step, entry.sim_time, entry.sim_days, entry.offset
                )?;
            }
        }
    }
    Ok(())
}

fn cmd_convert(input: &Path, output: &Path, to: Option<Mode>, out: &mut dyn Write) -> Result<()> {
    let mut reader = KeywordReader::open(input).with_context(|| format!("open {}", input.display()))?;
    let target = match to {
        Some(mode) => FileMode::from(mode),
        None => match reader.mode() {
            FileMode::Formatted => FileMode::Unformatted,
            FileMode::Unformatted => FileMode::Formatted,
        },
    };
    if input == output {
        bail!("input and output are the same file");
    }
    let mut writer = KeywordWriter::create_with_config(output, &StreamConfig::default().with_mode(target))
        .with_context(|| format!("create {}", output.display()))?;
    while let Some(record) = reader.next_record()? {
        writer.append(&record)?;
    }
    let records = writer.records_written();
    writer.finish()?;
    writeln!(out, "wrote {records} keywords to {} ({target:?})", output.display())?;
    Ok(())
}

fn cmd_import(path: &Path, parquet: Option<&Path>, out: &mut dyn Write) -> Result<()> {
    let report = import_file(path);
    if !report.success {
        bail!(
            "import of {} failed: {}",
            path.display(),
            report.error_text.unwrap_or_default()
        );
    }
    for s in &report.series {
        writeln!(out, "{} ({} values)", s.name, s.len())?;
    }
    if report.skipped_rows > 0 {
        writeln!(out, "skipped {} rows", report.skipped_rows)?;
    }
    if let Some(target) = parquet {
        let rows = export_parquet(target, &report.series)?;
        writeln!(out, "exported {rows} rows to {}", target.display())?;
    }
    Ok(())
}
