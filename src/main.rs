//! # casereport CLI
//!
//! Usage:
//!   casereport detail record.json [-o out.pdf]
//!   casereport batch records.json [-o out.pdf]
//!   casereport stats stats.json --filter "Last 30 days" [-o out.pdf]
//!   echo '{ ... }' | casereport detail
//!   casereport --example detail > record.json
//!
//! Common options:
//!   --config cfg.json   export configuration (geometry, image limits)
//!   --page a4|letter    page size preset, overrides the config geometry
//!
//! Without `-o` the report is written to the current directory under its
//! suggested filename. Set `RUST_LOG=debug` to trace page breaks and image
//! fetches.

use std::env;
use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use casereport::{
    ExportConfig, ExportError, ExportedFile, Exporter, PageGeometry, RecordView, SummaryStatistics,
};

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if let Some(kind) = option_value(&args, "--example") {
        match example_json(&kind) {
            Some(json) => print!("{}", json),
            None => {
                eprintln!("✗ Unknown example {:?}; expected detail, batch, or stats", kind);
                std::process::exit(2);
            }
        }
        return;
    }

    let report = match args.get(1).map(String::as_str) {
        Some("detail") => Report::Detail,
        Some("batch") => Report::Batch,
        Some("stats") => Report::Stats,
        _ => {
            eprintln!("usage: casereport <detail|batch|stats> [input.json] [-o output.pdf]");
            std::process::exit(2);
        }
    };

    match run(report, &args) {
        Ok(written) => eprintln!("✓ Written {}", written),
        Err(e) => {
            eprintln!("✗ {}", e);
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
            std::process::exit(1);
        }
    }
}

#[derive(Clone, Copy)]
enum Report {
    Detail,
    Batch,
    Stats,
}

fn run(report: Report, args: &[String]) -> Result<String, ExportError> {
    let mut config = match option_value(args, "--config") {
        Some(path) => ExportConfig::from_json_file(path)?,
        None => ExportConfig::default(),
    };
    if let Some(page) = option_value(args, "--page") {
        config.geometry = match page.to_ascii_lowercase().as_str() {
            "a4" => PageGeometry::a4(),
            "letter" => PageGeometry::letter(),
            other => {
                return Err(ExportError::InvalidGeometry(format!(
                    "unknown page preset {:?}",
                    other
                )))
            }
        };
    }
    let geometry = config.geometry;
    let exporter = Exporter::new(config);
    let input = read_input(args)?;

    let file = match report {
        Report::Detail => {
            let record: RecordView = serde_json::from_str(&input)?;
            exporter.export_detail(&record, &geometry)?
        }
        Report::Batch => {
            let records: Vec<RecordView> = serde_json::from_str(&input)?;
            exporter.export_batch(&records, &geometry)?
        }
        Report::Stats => {
            let stats: SummaryStatistics = serde_json::from_str(&input)?;
            let filter = option_value(args, "--filter").unwrap_or_default();
            exporter.export_summary_statistics(&stats, &filter, &geometry)?
        }
    };

    write_output(&file, option_value(args, "-o").as_deref())
}

fn write_output(file: &ExportedFile, output: Option<&str>) -> Result<String, ExportError> {
    let path = match output {
        Some(path) => {
            file.write_to_path(path)?;
            Path::new(path).to_path_buf()
        }
        None => file.write_to_dir(".")?,
    };
    Ok(format!("{} bytes to {}", file.bytes.len(), path.display()))
}

/// Input file is the first positional argument after the command; stdin
/// otherwise.
fn read_input(args: &[String]) -> Result<String, ExportError> {
    let mut positional = args.iter().skip(2);
    let mut path = None;
    while let Some(arg) = positional.next() {
        if arg.starts_with('-') {
            positional.next();
            continue;
        }
        path = Some(arg);
        break;
    }
    match path {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn option_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].clone())
}

fn example_json(kind: &str) -> Option<&'static str> {
    match kind {
        "detail" => Some(EXAMPLE_RECORD),
        "batch" => Some(EXAMPLE_BATCH),
        "stats" => Some(EXAMPLE_STATS),
        _ => None,
    }
}

const EXAMPLE_RECORD: &str = r##"{
  "id": "3f9a2c71-5b4e-4d1a-9c0e-7d2b1a6f8e45",
  "requester": {
    "name": "Dana Whitfield",
    "email": "dana.whitfield@example.com"
  },
  "category": "Plumbing",
  "description": "Kitchen sink drains slowly and the cabinet underneath is damp.\nWater pools after running the dishwasher.",
  "additionalNotes": "Side gate code is 4412. Dog is friendly.",
  "preferredDate": "2026-10-20T09:00:00Z",
  "createdAt": "2026-10-14T16:42:00Z",
  "status": "in_progress",
  "handler": { "name": "Lee Park", "email": "lee.park@example.com" },
  "assignee": {
    "name": "Sam Ortega",
    "mobile": "+1 555 0134",
    "notes": "Bring the long auger."
  },
  "attachments": [
    "https://files.example.com/uploads/under-sink%20photo.jpg",
    "https://files.example.com/uploads/quote.pdf"
  ],
  "shortlistCount": 3
}
"##;

const EXAMPLE_BATCH: &str = r##"[
  {
    "id": "3f9a2c71-5b4e-4d1a-9c0e-7d2b1a6f8e45",
    "requester": { "name": "Dana Whitfield" },
    "category": "Plumbing",
    "description": "Kitchen sink drains slowly.",
    "createdAt": "2026-10-14T16:42:00Z",
    "status": "pending"
  },
  {
    "id": "81c0d4e2-2a7f-4b6c-8e19-0f3a5d7c9b21",
    "requester": { "name": "Ari Mendel", "email": "ari@example.com" },
    "category": "Electrical",
    "description": "Breaker trips when the oven and kettle run together.",
    "createdAt": "2026-10-13T11:05:00Z",
    "status": "completed",
    "handler": { "name": "Lee Park" }
  }
]
"##;

const EXAMPLE_STATS: &str = r##"{
  "totalRequests": 128,
  "statusBreakdown": [
    { "label": "pending", "count": 40 },
    { "label": "in_progress", "count": 33 },
    { "label": "completed", "count": 55 }
  ],
  "categoryBreakdown": [
    { "label": "Plumbing", "count": 51 },
    { "label": "Electrical", "count": 44 },
    { "label": "Carpentry", "count": 33 }
  ],
  "topHandlers": [
    { "label": "Lee Park", "count": 29 },
    { "label": "Jo Brandt", "count": 21 }
  ],
  "periodLabel": "Sep 15 - Oct 15, 2026"
}
"##;
