//! Export row materialization and serialization.
//!
//! Projects cached paragraph records into flat rows, optionally enriched
//! with NLP columns, and writes them as CSV (RFC 4180 via the `csv` crate)
//! or JSONL. Artifacts are written atomically: temp file in the exports
//! directory, then rename.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::types::{ExportFormat, ExportResult, BASE_COLUMNS, NLP_COLUMNS};
use crate::config::Config;
use crate::docforge::analyze::{AnalyzeOptions, NlpEngine};
use crate::docforge::extract::types::{ParagraphRecord, ParsedDocument};

/// One paragraph projected to a flat export row
fn base_row(paragraph: &ParagraphRecord) -> Map<String, Value> {
    let mut row = Map::new();
    row.insert("file_id".into(), json!(paragraph.file_id));
    row.insert("paragraph_id".into(), json!(paragraph.id));
    row.insert("page".into(), json!(paragraph.page));
    row.insert("paragraph_index".into(), json!(paragraph.paragraph_index));
    row.insert("text".into(), json!(paragraph.text));
    row.insert("word_count".into(), json!(paragraph.word_count));
    row.insert("char_count".into(), json!(paragraph.char_count));
    row
}

/// Attaches the six NLP columns to a row.
///
/// Every column degrades to null independently: an analysis failure on one
/// paragraph never aborts the row, and a missing subsystem nulls only its
/// own columns.
fn attach_nlp(row: &mut Map<String, Value>, engine: &NlpEngine, text: &str) {
    let analysis = match engine.analyze(text, &AnalyzeOptions::default()) {
        Ok(analysis) => analysis,
        Err(e) => {
            warn!("NLP enrichment failed for an export row: {}", e);
            for column in NLP_COLUMNS {
                row.insert((*column).into(), Value::Null);
            }
            return;
        }
    };

    match analysis
        .entities
        .as_ref()
        .and_then(|e| serde_json::to_string(e).ok())
    {
        Some(encoded) => {
            row.insert("nlp_entities".into(), json!(encoded));
            row.insert(
                "nlp_entities_count".into(),
                json!(analysis.entities.as_ref().map(|e| e.len()).unwrap_or(0)),
            );
        }
        None => {
            row.insert("nlp_entities".into(), Value::Null);
            row.insert("nlp_entities_count".into(), Value::Null);
        }
    }

    match analysis
        .keywords
        .as_ref()
        .and_then(|k| serde_json::to_string(k).ok())
    {
        Some(encoded) => {
            row.insert("nlp_keywords".into(), json!(encoded));
        }
        None => {
            row.insert("nlp_keywords".into(), Value::Null);
        }
    }

    match &analysis.sentiment {
        Some(sentiment) => {
            row.insert("nlp_sentiment".into(), json!(sentiment.sentiment));
            row.insert("nlp_sentiment_score".into(), json!(sentiment.score));
            row.insert(
                "nlp_sentiment_confidence".into(),
                json!(sentiment.confidence),
            );
        }
        None => {
            row.insert("nlp_sentiment".into(), Value::Null);
            row.insert("nlp_sentiment_score".into(), Value::Null);
            row.insert("nlp_sentiment_confidence".into(), Value::Null);
        }
    }
}

/// Builds every export row for a parsed document
pub fn build_rows(
    document: &ParsedDocument,
    include_annotations: bool,
    include_nlp: bool,
    engine: &NlpEngine,
) -> Vec<Map<String, Value>> {
    document
        .paragraphs
        .iter()
        .map(|paragraph| {
            let mut row = base_row(paragraph);
            if include_nlp {
                attach_nlp(&mut row, engine, &paragraph.text);
            }
            if include_annotations {
                for (key, value) in &paragraph.annotations {
                    row.insert(key.clone(), value.clone());
                }
            }
            row
        })
        .collect()
}

/// The full ordered column list for a row set
pub fn column_order(rows: &[Map<String, Value>], include_nlp: bool) -> Vec<String> {
    let mut columns: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
    if include_nlp {
        columns.extend(NLP_COLUMNS.iter().map(|c| c.to_string()));
    }

    // Annotation keys: the sorted union across all rows.
    let mut extra: Vec<String> = rows
        .iter()
        .flat_map(|row| row.keys())
        .filter(|k| !columns.iter().any(|c| c == *k))
        .cloned()
        .collect();
    extra.sort_unstable();
    extra.dedup();
    columns.extend(extra);
    columns
}

/// Renders one JSON value as a CSV cell
fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn write_csv(rows: &[Map<String, Value>], columns: &[String], path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .context("Failed to open CSV writer")?;

    writer.write_record(columns)?;
    for row in rows {
        let record: Vec<String> = columns.iter().map(|c| cell(row.get(c))).collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_jsonl(rows: &[Map<String, Value>], columns: &[String], path: &Path) -> Result<()> {
    let mut out = String::new();
    for row in rows {
        // Key order follows the column order so re-exports are
        // byte-identical.
        let mut ordered = Map::new();
        for column in columns {
            if let Some(value) = row.get(column) {
                ordered.insert(column.clone(), value.clone());
            }
        }
        out.push_str(&serde_json::to_string(&Value::Object(ordered))?);
        out.push('\n');
    }
    std::fs::write(path, out).context("Failed to write JSONL artifact")?;
    Ok(())
}

/// Materializes a parsed document into an export artifact on disk.
pub fn export_document(
    document: &ParsedDocument,
    format: ExportFormat,
    include_annotations: bool,
    include_nlp: bool,
    engine: &NlpEngine,
) -> Result<ExportResult> {
    let exports_dir = PathBuf::from(&Config::global().exports_dir);
    std::fs::create_dir_all(&exports_dir).context("Failed to create exports directory")?;

    let rows = build_rows(document, include_annotations, include_nlp, engine);
    let columns = column_order(&rows, include_nlp);

    let filename = format!("{}_export.{}", document.file_id, format.extension());
    let final_path = exports_dir.join(&filename);
    let tmp_path = exports_dir.join(format!(".{}.tmp-{}", filename, Uuid::new_v4()));

    let written = match format {
        ExportFormat::Csv => write_csv(&rows, &columns, &tmp_path),
        ExportFormat::Jsonl => write_jsonl(&rows, &columns, &tmp_path),
    };
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    std::fs::rename(&tmp_path, &final_path).context("Failed to move export into place")?;

    info!(
        "Exported {} rows for {} as {}",
        rows.len(),
        document.file_id,
        filename
    );

    Ok(ExportResult {
        download_url: format!("/api/export/{}", document.file_id),
        record_count: rows.len(),
        filename,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docforge::extract::enrich;
    use crate::docforge::extract::types::ExtractionMethod;

    fn paragraph(file_id: &str, index: u32, text: &str) -> ParagraphRecord {
        ParagraphRecord {
            id: format!("{}:p{}", file_id, index),
            file_id: file_id.to_string(),
            page: 1,
            paragraph_index: index,
            word_count: enrich::word_count(text),
            char_count: enrich::char_count(text),
            metadata: enrich::enrich(text),
            text: text.to_string(),
            annotations: Default::default(),
        }
    }

    fn document(file_id: &str, texts: &[&str]) -> ParsedDocument {
        ParsedDocument {
            file_id: file_id.to_string(),
            filename: format!("{}.pdf", file_id),
            total_pages: 1,
            extraction_method: ExtractionMethod::PdfText,
            paragraphs: texts
                .iter()
                .enumerate()
                .map(|(i, t)| paragraph(file_id, i as u32, t))
                .collect(),
        }
    }

    #[test]
    fn test_rows_follow_paragraph_order() {
        let doc = document("f1", &["First paragraph here.", "Second paragraph here."]);
        let rows = build_rows(&doc, false, false, &NlpEngine::test_instance());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["paragraph_id"], json!("f1:p0"));
        assert_eq!(rows[1]["paragraph_id"], json!("f1:p1"));
    }

    #[test]
    fn test_nlp_columns_present_when_requested() {
        let doc = document("f1", &["Customers love the excellent design."]);
        let rows = build_rows(&doc, false, true, &NlpEngine::test_instance());
        let row = &rows[0];
        for column in NLP_COLUMNS {
            assert!(row.contains_key(*column), "missing {column}");
        }
        assert_eq!(row["nlp_sentiment"], json!("positive"));
    }

    #[test]
    fn test_annotation_columns_sorted_after_fixed_ones() {
        let mut doc = document("f1", &["Annotated paragraph text."]);
        doc.paragraphs[0]
            .annotations
            .insert("zeta".into(), json!("z"));
        doc.paragraphs[0]
            .annotations
            .insert("alpha".into(), json!("a"));

        let rows = build_rows(&doc, true, false, &NlpEngine::test_instance());
        let columns = column_order(&rows, false);
        let base_len = BASE_COLUMNS.len();
        assert_eq!(&columns[base_len..], &["alpha".to_string(), "zeta".to_string()]);
    }

    #[test]
    fn test_jsonl_round_trips_identifying_fields() {
        let dir = std::env::temp_dir().join(format!("docforge-export-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let doc = document("f1", &["Round trip text one.", "Round trip text two."]);
        let rows = build_rows(&doc, false, false, &NlpEngine::test_instance());
        let columns = column_order(&rows, false);
        let path = dir.join("out.jsonl");
        write_jsonl(&rows, &columns, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(parsed.len(), doc.paragraphs.len());
        for (line, paragraph) in parsed.iter().zip(&doc.paragraphs) {
            assert_eq!(line["paragraph_id"], json!(paragraph.id));
            assert_eq!(line["file_id"], json!(paragraph.file_id));
            assert_eq!(line["text"], json!(paragraph.text));
            assert_eq!(line["word_count"], json!(paragraph.word_count));
        }
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_csv_has_header_and_quoting() {
        let dir = std::env::temp_dir().join(format!("docforge-export-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let doc = document("f1", &["Contains, a comma and \"quotes\"."]);
        let rows = build_rows(&doc, false, false, &NlpEngine::test_instance());
        let columns = column_order(&rows, false);
        let path = dir.join("out.csv");
        write_csv(&rows, &columns, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next().unwrap().split(',').next().unwrap(), "file_id");
        // RFC 4180: internal quotes are doubled inside a quoted field.
        assert!(contents.contains("\"\""));

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[4], "Contains, a comma and \"quotes\".");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_csv_writes_are_deterministic() {
        let dir = std::env::temp_dir().join(format!("docforge-export-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let doc = document("f1", &["Stable output text."]);
        let engine = NlpEngine::test_instance();

        let rows_a = build_rows(&doc, false, true, &engine);
        let rows_b = build_rows(&doc, false, true, &engine);
        let columns = column_order(&rows_a, true);

        let path_a = dir.join("a.csv");
        let path_b = dir.join("b.csv");
        write_csv(&rows_a, &columns, &path_a).unwrap();
        write_csv(&rows_b, &columns, &path_b).unwrap();
        assert_eq!(
            std::fs::read(&path_a).unwrap(),
            std::fs::read(&path_b).unwrap()
        );
        std::fs::remove_dir_all(&dir).ok();
    }
}
