use super::{load_file, PdfEngine};
use anyhow::{Context, Result};
use pagecraft::pdf::PdfInfo;
use pagecraft::WorkingSet;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct InfoReport {
    pub file: String,
    pub byte_size: u64,
    #[serde(flatten)]
    pub info: PdfInfo,
}

pub async fn execute(engine: &PdfEngine, path: &Path) -> Result<InfoReport> {
    let mut sources = WorkingSet::new();
    let id = load_file(engine, &mut sources, path).await?;
    let source = sources.get(id).context("Source vanished after loading")?;

    Ok(InfoReport {
        file: path.display().to_string(),
        byte_size: source.byte_size(),
        info: source.handle().info(),
    })
}

pub async fn run(engine: &PdfEngine, path: &Path) -> Result<()> {
    let report = execute(engine, path).await?;
    let info = &report.info;

    println!("File: {}", report.file);
    println!("Size: {} bytes", report.byte_size);
    println!("Pages: {}", info.page_count);

    let fields = [
        ("Title", &info.title),
        ("Author", &info.author),
        ("Subject", &info.subject),
        ("Keywords", &info.keywords),
        ("Creator", &info.creator),
        ("Producer", &info.producer),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("{}: {}", label, value);
        }
    }
    if let Some(creation_date) = &info.creation_date {
        println!("Created: {}", format_pdf_date(creation_date));
    }
    if let Some(mod_date) = &info.mod_date {
        println!("Modified: {}", format_pdf_date(mod_date));
    }

    Ok(())
}

/// `D:YYYYMMDDHHmmSS...` as `YYYY-MM-DD HH:mm:SS`; anything else unchanged.
fn format_pdf_date(date: &str) -> String {
    let Some(d) = date.strip_prefix("D:") else {
        return date.to_string();
    };
    if d.len() < 8 || !d.is_char_boundary(8) || !d[..8].bytes().all(|b| b.is_ascii_digit()) {
        return date.to_string();
    }

    let time = match d.get(8..14) {
        Some(t) if t.bytes().all(|b| b.is_ascii_digit()) => {
            format!(" {}:{}:{}", &t[0..2], &t[2..4], &t[4..6])
        }
        _ => String::new(),
    };
    format!("{}-{}-{}{}", &d[0..4], &d[4..6], &d[6..8], time)
}
