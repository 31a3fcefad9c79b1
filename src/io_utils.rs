//! File and stream plumbing around the pure import pipeline.
//!
//! - **Input**: upload files (or stdin via the `-` path) are read as bytes,
//!   size-checked, then decoded with `encoding_rs` (UTF-8 unless overridden).
//! - **Existing records**: snapshots of stored clients load from JSON arrays
//!   or from CSV files with `id,name,email` headers.
//! - **Plan export**: planned inserts and updates are written as a fully
//!   quoted CSV, one row per action.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use itertools::Itertools;

use crate::{
    error::ImportError,
    merge::{ClientDraft, ExistingRecord, MergeOutcome, MergeTarget},
};

pub const PLAN_HEADERS: &[&str] = &[
    "action", "target", "name", "company", "email", "phone", "status", "tags",
];

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

/// Reads an upload from `path` (stdin for `-`), refusing anything larger
/// than `max_size` bytes before decoding.
pub fn read_upload(path: &Path, encoding: &'static Encoding, max_size: usize) -> Result<String> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    };
    let mut bytes = Vec::new();
    // One byte past the limit is enough to know the upload is too large.
    let limit = u64::try_from(max_size).unwrap_or(u64::MAX).saturating_add(1);
    reader
        .take(limit)
        .read_to_end(&mut bytes)
        .with_context(|| format!("Reading input file {path:?}"))?;
    if bytes.len() > max_size {
        let size = if is_dash(path) {
            bytes.len()
        } else {
            std::fs::metadata(path)
                .ok()
                .and_then(|meta| usize::try_from(meta.len()).ok())
                .unwrap_or(bytes.len())
        };
        return Err(ImportError::SizeLimitExceeded {
            size,
            limit: max_size,
        }
        .into());
    }
    decode_bytes(&bytes, encoding).with_context(|| format!("Decoding input file {path:?}"))
}

/// Loads stored-client snapshots. `.json` files hold an array of
/// `{ "id", "name", "email"? }` objects; anything else is read as CSV.
pub fn load_existing_records(path: &Path) -> Result<Vec<ExistingRecord>> {
    let file = File::open(path).with_context(|| format!("Opening existing records {path:?}"))?;
    let reader = BufReader::new(file);
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        return serde_json::from_reader(reader)
            .with_context(|| format!("Parsing existing records JSON {path:?}"));
    }

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    csv_reader
        .deserialize()
        .enumerate()
        .map(|(idx, record)| {
            record.with_context(|| format!("Reading existing record row {} in {path:?}", idx + 2))
        })
        .collect()
}

pub fn open_plan_writer(path: Option<&Path>) -> Result<csv::Writer<Box<dyn Write>>> {
    let base: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    let mut builder = csv::WriterBuilder::new();
    builder.quote_style(QuoteStyle::Always).double_quote(true);
    Ok(builder.from_writer(base))
}

fn plan_record(action: &str, target: String, client: &ClientDraft) -> Vec<String> {
    vec![
        action.to_string(),
        target,
        client.name.clone(),
        client.company.clone().unwrap_or_default(),
        client.email.clone().unwrap_or_default(),
        client.phone.clone().unwrap_or_default(),
        client.status.to_string(),
        client.tags.iter().join("|"),
    ]
}

/// Writes one CSV row per planned insert and update. Updates of rows created
/// in the same batch reference them as `new:<position>`.
pub fn write_plan<W: Write>(writer: &mut csv::Writer<W>, outcome: &MergeOutcome) -> Result<usize> {
    writer
        .write_record(PLAN_HEADERS)
        .context("Writing plan headers")?;
    let mut written = 0usize;
    for (position, client) in outcome.inserts.iter().enumerate() {
        writer
            .write_record(plan_record("insert", format!("new:{position}"), client))
            .with_context(|| format!("Writing insert for '{}'", client.name))?;
        written += 1;
    }
    for update in &outcome.updates {
        let target = match &update.target {
            MergeTarget::Existing(id) => id.to_string(),
            MergeTarget::Pending(position) => format!("new:{position}"),
        };
        writer
            .write_record(plan_record("update", target, &update.client))
            .with_context(|| format!("Writing update for '{}'", update.client.name))?;
        written += 1;
    }
    writer.flush().context("Flushing plan writer")?;
    Ok(written)
}
