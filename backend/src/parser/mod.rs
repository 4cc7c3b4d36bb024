//! Upload decoding: spreadsheets and delimited text into observation tables.
//!
//! Spreadsheets (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`) yield one table per
//! sheet. Delimited text gets encoding and delimiter auto-detection and yields a
//! single table named after the file. No dashboard-specific logic here.

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use crate::error::{DecodeError, DecodeResult};
use crate::models::{CellValue, ObservationTable, Row, SourceFormat, Workbook};

/// Table name used when a CSV upload has no usable file name.
pub const DEFAULT_SHEET_NAME: &str = "sheet1";

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

/// Broad kind of an uploaded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Delimited,
    Spreadsheet,
}

/// Decide how to read a payload: magic bytes first, then the file extension.
pub fn detect_format(bytes: &[u8], file_name: Option<&str>) -> DecodeResult<FileKind> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) {
        return Ok(FileKind::Spreadsheet);
    }

    let extension = file_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => Ok(FileKind::Spreadsheet),
        Some("csv" | "txt" | "tsv") => Ok(FileKind::Delimited),
        _ if looks_like_text(bytes) => Ok(FileKind::Delimited),
        Some(other) => Err(DecodeError::UnsupportedFormat(format!(".{}", other))),
        None => Err(DecodeError::UnsupportedFormat("binary data".to_string())),
    }
}

fn looks_like_text(bytes: &[u8]) -> bool {
    !bytes.iter().take(4096).any(|&b| b == 0)
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "utf-8-sig" | "" => "utf-8".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> DecodeResult<String> {
    let text = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8(bytes.to_vec())
            .map_err(|e| DecodeError::Encoding(e.to_string()))?,
        // WHATWG maps the latin-1 labels onto windows-1252
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        label => {
            let codec = encoding_rs::Encoding::for_label(label.as_bytes())
                .ok_or_else(|| DecodeError::Encoding(format!("unknown encoding '{}'", label)))?;
            let (decoded, _, had_errors) = codec.decode(bytes);
            if had_errors {
                return Err(DecodeError::Encoding(format!("invalid {} text", codec.name())));
            }
            decoded.into_owned()
        }
    };

    Ok(text.trim_start_matches('\u{feff}').to_string())
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Make header names usable as column keys: blanks get a placeholder and
/// repeats get a numeric suffix.
fn normalize_headers<I: IntoIterator<Item = String>>(raw: I) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.into_iter()
        .enumerate()
        .map(|(i, name)| {
            let base = match name.trim() {
                "" => format!("Unnamed: {}", i),
                trimmed => trimmed.to_string(),
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let header = if *count == 0 {
                base
            } else {
                format!("{}.{}", base, count)
            };
            *count += 1;
            header
        })
        .collect()
}

/// Parse delimited text into a single table.
///
/// # Example
/// ```ignore
/// use timesdash::parser::parse_csv_str;
///
/// let table = parse_csv_str("Commodity,Period,Pv\nELCCO2,2020,5", ',', "emission").unwrap();
/// assert_eq!(table.len(), 1);
/// ```
pub fn parse_csv_str(content: &str, delimiter: char, name: &str) -> DecodeResult<ObservationTable> {
    if content.trim().is_empty() {
        return Err(DecodeError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| DecodeError::Csv(format!("Cannot read header: {}", e)))?
        .clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(DecodeError::NoHeaders);
    }
    let headers = normalize_headers(headers.iter().map(String::from));

    let mut records: Vec<Vec<String>> = Vec::new();
    for (line_idx, result) in reader.records().enumerate() {
        let line_num = line_idx + 2; // +1 for 0-index, +1 for header
        let record = result.map_err(|e| DecodeError::Csv(format!("line {}: {}", line_num, e)))?;

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        records.push(record.iter().map(String::from).collect());
    }

    Ok(ObservationTable::from_records(name, headers, &records))
}

/// Convert one spreadsheet cell.
fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) if f.is_finite() => CellValue::Number(*f),
        Data::String(s) => CellValue::from_text(s),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::Empty | Data::Error(_) => CellValue::Missing,
        other => CellValue::from_text(&other.to_string()),
    }
}

fn is_blank_row(row: &[Data]) -> bool {
    row.iter().all(|cell| match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    })
}

/// Read every sheet of a spreadsheet held in memory.
pub fn parse_spreadsheet(bytes: &[u8]) -> DecodeResult<Workbook> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)
        .map_err(|e| DecodeError::Spreadsheet(e.to_string()))?;

    #[allow(unreachable_patterns)]
    let format = match &workbook {
        Sheets::Xls(_) => SourceFormat::Xls,
        Sheets::Xlsx(_) => SourceFormat::Xlsx,
        Sheets::Xlsb(_) => SourceFormat::Xlsb,
        Sheets::Ods(_) => SourceFormat::Ods,
        _ => SourceFormat::Xlsx,
    };

    let sheet_names = workbook.sheet_names().to_vec();
    let mut tables = Vec::with_capacity(sheet_names.len());

    for name in sheet_names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| DecodeError::Spreadsheet(format!("sheet '{}': {}", name, e)))?;

        let mut rows = range.rows().skip_while(|row| is_blank_row(row));
        let header_row = match rows.next() {
            Some(row) => row,
            None => continue, // sheet without a header row carries nothing to chart
        };
        let headers = normalize_headers(header_row.iter().map(|c| c.to_string()));

        let mut table = ObservationTable::new(name.clone(), headers);
        for row in rows {
            if is_blank_row(row) {
                continue;
            }
            let cells: Row = table
                .columns
                .iter()
                .enumerate()
                .map(|(i, column)| {
                    let cell = row.get(i).map(cell_from_data).unwrap_or(CellValue::Missing);
                    (column.clone(), cell)
                })
                .collect();
            table.push_row(cells);
        }
        tables.push(table);
    }

    Ok(Workbook { format, tables })
}

/// Parse delimited bytes with auto-detection of encoding and delimiter.
pub fn parse_delimited_bytes(bytes: &[u8], name: &str) -> DecodeResult<Workbook> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    let table = parse_csv_str(&content, delimiter, name)?;

    Ok(Workbook {
        format: SourceFormat::Csv {
            encoding,
            delimiter,
        },
        tables: vec![table],
    })
}

/// Decode an uploaded payload of any supported kind.
///
/// `file_name` is used as a format hint and, for delimited text, as the
/// table name (its stem).
pub fn parse_bytes_auto(bytes: &[u8], file_name: Option<&str>) -> DecodeResult<Workbook> {
    match detect_format(bytes, file_name)? {
        FileKind::Spreadsheet => parse_spreadsheet(bytes),
        FileKind::Delimited => {
            let name = file_name
                .and_then(|n| Path::new(n).file_stem())
                .and_then(|s| s.to_str())
                .filter(|s| !s.is_empty())
                .unwrap_or(DEFAULT_SHEET_NAME);
            parse_delimited_bytes(bytes, name)
        }
    }
}

/// Read and decode a file from disk.
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> DecodeResult<Workbook> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let file_name = path.file_name().and_then(|n| n.to_str());
    parse_bytes_auto(&bytes, file_name)
}
