//! CSV table parser and serializer.
//!
//! Tables are semicolon-delimited with comma decimals, headed by
//! `data;descricao;valor;id`. Only `id` is optional when reading.

use crate::encoding;
use crate::error::{Error, Result};
use crate::types::{RecordSet, TransactionRecord};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::{Read, Write};
use std::str::FromStr;

const DELIMITER: u8 = b';';

const DATE_COLUMN: &str = "data";
const DESCRIPTION_COLUMN: &str = "descricao";
const AMOUNT_COLUMN: &str = "valor";
const ID_COLUMN: &str = "id";

/// Required columns with the meaning reported when they are missing.
const REQUIRED_COLUMNS: [(&str, &str); 3] = [
    (DATE_COLUMN, "date"),
    (DESCRIPTION_COLUMN, "description"),
    (AMOUNT_COLUMN, "amount"),
];

/// Represents a CSV table of transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    /// Rows in file order.
    pub records: RecordSet,
}

/// CSV row as written.
#[derive(Debug, Serialize)]
struct CsvRecord<'a> {
    data: String,
    descricao: &'a str,
    valor: String,
    id: &'a str,
}

/// Column positions resolved from the header row.
struct Columns {
    date: usize,
    description: usize,
    amount: usize,
    id: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h == name);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|(name, _)| find(name).is_none())
            .map(|(name, meaning)| format!("{} ({})", name, meaning))
            .collect();

        match (find(DATE_COLUMN), find(DESCRIPTION_COLUMN), find(AMOUNT_COLUMN)) {
            (Some(date), Some(description), Some(amount)) => Ok(Columns {
                date,
                description,
                amount,
                id: find(ID_COLUMN),
            }),
            _ => Err(Error::SchemaError { missing }),
        }
    }
}

impl CsvTable {
    /// Parse a CSV table from any source implementing `Read`.
    ///
    /// Text is decoded as UTF-8, or as Windows-1252 when it is not valid
    /// UTF-8. Any row with an invalid date or amount fails the whole table.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::fs::File;
    /// use conversor::csv_format::CsvTable;
    ///
    /// let mut file = File::open("extrato.csv")?;
    /// let table = CsvTable::from_read(&mut file)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Parse a CSV table from raw file contents.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (text, fell_back) = encoding::decode_utf8_or_single_byte(bytes);
        if fell_back {
            tracing::debug!("CSV input is not UTF-8, decoded as windows-1252");
        }

        let mut csv_reader = ReaderBuilder::new()
            .delimiter(DELIMITER)
            .trim(Trim::Headers)
            .from_reader(text.as_bytes());

        let columns = Columns::resolve(csv_reader.headers()?)?;
        let mut records = Vec::new();

        for result in csv_reader.records() {
            let row = result?;
            let line = row.position().map(|p| p.line()).unwrap_or_default();
            let field = |index: usize| row.get(index).unwrap_or("");

            let date = parse_date(field(columns.date)).map_err(|reason| Error::ValidationError {
                line,
                column: DATE_COLUMN.to_string(),
                value: field(columns.date).to_string(),
                reason,
            })?;
            let amount = parse_amount(field(columns.amount)).map_err(|reason| Error::ValidationError {
                line,
                column: AMOUNT_COLUMN.to_string(),
                value: field(columns.amount).to_string(),
                reason,
            })?;

            records.push(TransactionRecord {
                date,
                description: field(columns.description).to_string(),
                amount,
                id: columns.id.map(field).unwrap_or_default().to_string(),
            });
        }

        Ok(CsvTable { records })
    }

    /// Write a CSV table to any destination implementing `Write`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::fs::File;
    /// use conversor::csv_format::CsvTable;
    ///
    /// let table = CsvTable { records: Vec::new() };
    /// let mut file = File::create("output.csv")?;
    /// table.write_to(&mut file)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut csv_writer = WriterBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(false)
            .from_writer(writer);

        // Written explicitly so that an empty table still has its header.
        csv_writer.write_record([DATE_COLUMN, DESCRIPTION_COLUMN, AMOUNT_COLUMN, ID_COLUMN])?;

        for record in &self.records {
            csv_writer.serialize(CsvRecord {
                data: record.date.format("%Y-%m-%d").to_string(),
                descricao: &record.description,
                valor: format_amount(record.amount),
                id: &record.id,
            })?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Render the table as CSV text.
    pub fn to_csv_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        String::from_utf8(buf).map_err(|e| Error::ParseError(e.to_string()))
    }
}

fn parse_date(date_str: &str) -> std::result::Result<NaiveDate, String> {
    let formats = [
        "%Y-%m-%d", // 2024-02-20
        "%d/%m/%Y", // 20/02/2024
        "%d-%m-%Y", // 20-02-2024
        "%d.%m.%Y", // 20.02.2024
    ];

    let trimmed = date_str.trim();
    // Tolerate a trailing time, as spreadsheet exports often add one.
    let day = trimmed.split_whitespace().next().unwrap_or(trimmed);

    // chrono's %Y also takes "24", which would land in year 24.
    if !day.split(['-', '/', '.']).any(|part| part.len() == 4) {
        return Err("expected a four-digit year".to_string());
    }

    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(day, format).ok())
        .ok_or_else(|| "expected YYYY-MM-DD or DD/MM/YYYY".to_string())
}

fn parse_amount(amount_str: &str) -> std::result::Result<Decimal, String> {
    let is_noise = |c: char| c.is_whitespace() || c.is_alphabetic() || is_currency_symbol(c);

    // Currency symbols and codes may sit on either side of the sign:
    // "R$ 1.234,56", "-R$ 50,00", "R$ -50,00", "10,00 BRL"
    let stripped = amount_str.trim_matches(is_noise);
    let (negative, unsigned) = match stripped.chars().next() {
        Some('-') => (true, &stripped[1..]),
        Some('+') => (false, &stripped[1..]),
        _ => (false, stripped),
    };
    let compact: String = unsigned
        .trim_matches(is_noise)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let normalized = if compact.contains(',') {
        compact.replace('.', "").replace(',', ".")
    } else if has_thousands_groups(&compact) {
        compact.replace('.', "")
    } else {
        compact
    };

    if normalized.is_empty() || normalized.starts_with(['-', '+']) {
        return Err("not a number".to_string());
    }

    let amount = Decimal::from_str(&normalized).map_err(|_| "not a number".to_string())?;
    Ok(if negative { -amount } else { amount })
}

fn is_currency_symbol(c: char) -> bool {
    matches!(c, '$' | '€' | '£' | '¥' | '₹' | '¢')
}

/// Whether `s` looks like `1.234` or `12.345.678`: dots separating groups of three.
fn has_thousands_groups(s: &str) -> bool {
    let mut groups = s.split('.');
    let head = groups.next().unwrap_or("");
    let tail: Vec<&str> = groups.collect();

    !tail.is_empty()
        && (1..=3).contains(&head.len())
        && head.bytes().all(|b| b.is_ascii_digit())
        && tail.iter().all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()))
}

/// Format an amount with a comma decimal separator.
fn format_amount(amount: Decimal) -> String {
    amount.to_string().replace('.', ",")
}
