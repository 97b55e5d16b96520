//! OFX statement parser and serializer.
//!
//! Reads OFX 1.x (SGML, leaf elements without closing tags) and OFX 2.x
//! (XML) bank statements, and writes OFX 1.02 SGML documents.

use crate::encoding::{self, Declared};
use crate::error::{Error, Result};
use crate::types::{date_range, format_two_decimals, RecordSet, TransactionRecord};
use chrono::{Local, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::io::{Read, Write};
use std::str::FromStr;

/// Timestamp layout used by `DTSERVER`, `DTSTART`, `DTEND` and `DTPOSTED`.
const OFX_DATETIME: &str = "%Y%m%d%H%M%S";

const OFX_HEADER: &str = "OFXHEADER:100
DATA:OFXSGML
VERSION:102
SECURITY:NONE
ENCODING:USASCII
CHARSET:1252
COMPRESSION:NONE
OLDFILEUID:NONE
NEWFILEUID:NONE
";

/// Represents an OFX statement.
#[derive(Debug, Clone, PartialEq)]
pub struct OfxStatement {
    /// Transactions in document order.
    pub records: RecordSet,
}

impl OfxStatement {
    /// Parse an OFX statement from any source implementing `Read`.
    ///
    /// The declared encoding is tried first; if decoding or parsing fails
    /// the bytes are re-decoded (UTF-8 when valid, Windows-1252 otherwise)
    /// and parsed again.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::fs::File;
    /// use conversor::ofx_format::OfxStatement;
    ///
    /// let mut file = File::open("extrato.ofx")?;
    /// let statement = OfxStatement::from_read(&mut file)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Parse an OFX statement from raw file contents.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let declared = declared_encoding(bytes);

        let strict = encoding::decode_strict(bytes, declared)
            .and_then(|text| parse_transactions(&text).map_err(|e| e.to_string()));

        let strict_err = match strict {
            Ok(records) => return Ok(OfxStatement { records }),
            Err(e) => e,
        };

        tracing::debug!(
            encoding = declared.name(),
            reason = %strict_err,
            "strict OFX parse failed, retrying with fallback decoding"
        );

        // Statements written by this crate carry the USASCII header but UTF-8 text.
        let (text, _) = encoding::decode_utf8_or_single_byte(bytes);
        match parse_transactions(&text) {
            Ok(records) => Ok(OfxStatement { records }),
            Err(fallback) => Err(Error::StatementParse {
                strict: strict_err,
                fallback: fallback.to_string(),
            }),
        }
    }

    /// Write an OFX statement to any destination implementing `Write`,
    /// stamped with the current local time.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::fs::File;
    /// use conversor::ofx_format::OfxStatement;
    ///
    /// let statement = OfxStatement { records: Vec::new() };
    /// let mut file = File::create("output.ofx")?;
    /// // Fails with `Error::EmptyInput`: a statement needs transactions.
    /// statement.write_to(&mut file)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.write_to_at(writer, Local::now().naive_local())
    }

    /// Write an OFX statement with an explicit `DTSERVER` timestamp.
    pub fn write_to_at<W: Write>(&self, writer: &mut W, generated_at: NaiveDateTime) -> Result<()> {
        let (start, end) = date_range(&self.records).ok_or(Error::EmptyInput)?;

        write!(writer, "{}", OFX_HEADER)?;
        writeln!(writer)?;
        writeln!(writer, "<OFX>")?;
        writeln!(writer, "  <SIGNONMSGSRSV1>")?;
        writeln!(writer, "    <SONRS>")?;
        writeln!(writer, "      <STATUS>")?;
        writeln!(writer, "        <CODE>0</CODE>")?;
        writeln!(writer, "        <SEVERITY>INFO</SEVERITY>")?;
        writeln!(writer, "      </STATUS>")?;
        writeln!(writer, "      <DTSERVER>{}</DTSERVER>", generated_at.format(OFX_DATETIME))?;
        writeln!(writer, "      <LANGUAGE>POR</LANGUAGE>")?;
        writeln!(writer, "    </SONRS>")?;
        writeln!(writer, "  </SIGNONMSGSRSV1>")?;
        writeln!(writer, "  <BANKMSGSRSV1>")?;
        writeln!(writer, "    <STMTTRNRS>")?;
        writeln!(writer, "      <TRNUID>1</TRNUID>")?;
        writeln!(writer, "      <STATUS>")?;
        writeln!(writer, "        <CODE>0</CODE>")?;
        writeln!(writer, "        <SEVERITY>INFO</SEVERITY>")?;
        writeln!(writer, "      </STATUS>")?;
        writeln!(writer, "      <STMTRS>")?;
        writeln!(writer, "        <CURDEF>BRL</CURDEF>")?;
        writeln!(writer, "        <BANKACCTFROM>")?;
        writeln!(writer, "          <BANKID>000</BANKID>")?;
        writeln!(writer, "          <ACCTID>00000-0</ACCTID>")?;
        writeln!(writer, "          <ACCTTYPE>CHECKING</ACCTTYPE>")?;
        writeln!(writer, "        </BANKACCTFROM>")?;
        writeln!(writer, "        <BANKTRANLIST>")?;
        writeln!(writer, "          <DTSTART>{}</DTSTART>", format_ofx_date(&start))?;
        writeln!(writer, "          <DTEND>{}</DTEND>", format_ofx_date(&end))?;

        for (index, record) in self.records.iter().enumerate() {
            let trntype = if record.is_credit() { "CREDIT" } else { "DEBIT" };
            writeln!(writer, "          <STMTTRN>")?;
            writeln!(writer, "            <TRNTYPE>{}</TRNTYPE>", trntype)?;
            writeln!(writer, "            <DTPOSTED>{}</DTPOSTED>", format_ofx_date(&record.date))?;
            writeln!(writer, "            <TRNAMT>{}</TRNAMT>", format_two_decimals(record.amount))?;
            writeln!(writer, "            <FITID>{}{}</FITID>", record.date.format("%Y%m%d"), index)?;
            writeln!(writer, "            <MEMO>{}</MEMO>", escape(&record.description))?;
            writeln!(writer, "          </STMTTRN>")?;
        }

        writeln!(writer, "        </BANKTRANLIST>")?;
        writeln!(writer, "      </STMTRS>")?;
        writeln!(writer, "    </STMTTRNRS>")?;
        writeln!(writer, "  </BANKMSGSRSV1>")?;
        write!(writer, "</OFX>")?;

        Ok(())
    }

    /// Render the statement as OFX text.
    pub fn to_ofx_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        String::from_utf8(buf).map_err(|e| Error::ParseError(e.to_string()))
    }
}

/// Find the encoding a file declares in its header.
///
/// OFX 1.x uses `ENCODING:` header lines before the first tag, OFX 2.x an
/// XML declaration. Anything else is read as UTF-8.
fn declared_encoding(bytes: &[u8]) -> Declared {
    let header_end = bytes
        .windows(5)
        .position(|w| w.eq_ignore_ascii_case(b"<OFX>"))
        .unwrap_or(bytes.len());
    let header = String::from_utf8_lossy(&bytes[..header_end]);

    for line in header.lines() {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case("ENCODING") {
                return Declared::from_name(value).unwrap_or_default();
            }
        }
    }

    if let Some(start) = header.find("encoding=") {
        let rest = &header[start + "encoding=".len()..];
        let quote = rest.chars().next().unwrap_or('"');
        let label: String = rest.chars().skip(1).take_while(|c| *c != quote).collect();
        return Declared::from_name(&label).unwrap_or_default();
    }

    Declared::default()
}

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Open(&'a str),
    Close(&'a str),
    Text(&'a str),
}

/// Split markup into tags and text, skipping comments and processing
/// instructions.
fn tokenize(body: &str) -> Result<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = body;

    while !rest.is_empty() {
        match rest.find('<') {
            Some(0) => {
                let end = rest
                    .find('>')
                    .ok_or_else(|| Error::ParseError("unterminated tag".to_string()))?;
                let tag = rest[1..end].trim();
                if let Some(name) = tag.strip_prefix('/') {
                    tokens.push(Token::Close(name.trim()));
                } else if !tag.starts_with('?') && !tag.starts_with('!') {
                    // Attributes only appear in OFX 2 declarations; keep the name.
                    let name = tag.split_whitespace().next().unwrap_or("");
                    tokens.push(Token::Open(name.trim_end_matches('/')));
                }
                rest = &rest[end + 1..];
            }
            Some(next) => {
                tokens.push(Token::Text(&rest[..next]));
                rest = &rest[next..];
            }
            None => {
                tokens.push(Token::Text(rest));
                rest = "";
            }
        }
    }

    Ok(tokens)
}

#[derive(Default)]
struct PendingTransaction {
    posted: Option<String>,
    amount: Option<String>,
    fitid: Option<String>,
    memo: Option<String>,
    name: Option<String>,
}

impl PendingTransaction {
    fn set(&mut self, tag: &str, value: &str) {
        let slot = match tag.to_ascii_uppercase().as_str() {
            "DTPOSTED" => &mut self.posted,
            "TRNAMT" => &mut self.amount,
            "FITID" => &mut self.fitid,
            "MEMO" => &mut self.memo,
            "NAME" => &mut self.name,
            _ => return,
        };
        *slot = Some(unescape(value));
    }

    fn finish(self, index: usize) -> Result<TransactionRecord> {
        let posted = self
            .posted
            .ok_or_else(|| Error::MissingField(format!("DTPOSTED in transaction {}", index + 1)))?;
        let amount = self
            .amount
            .ok_or_else(|| Error::MissingField(format!("TRNAMT in transaction {}", index + 1)))?;

        Ok(TransactionRecord {
            date: parse_ofx_date(&posted)?,
            description: self.memo.or(self.name).unwrap_or_default(),
            amount: parse_ofx_amount(&amount)?,
            id: self.fitid.unwrap_or_default(),
        })
    }
}

/// Collect every `STMTTRN` block of an OFX document.
fn parse_transactions(text: &str) -> Result<RecordSet> {
    let upper = text.to_ascii_uppercase();
    let body_start = upper
        .find("<OFX>")
        .ok_or_else(|| Error::MissingField("<OFX> root element".to_string()))?;

    let tokens = tokenize(&text[body_start..])?;
    let mut records = Vec::new();
    let mut current: Option<PendingTransaction> = None;
    let mut last_open: Option<&str> = None;

    for token in tokens {
        match token {
            Token::Open(tag) if tag.eq_ignore_ascii_case("STMTTRN") => {
                if current.is_some() {
                    return Err(Error::ParseError(format!(
                        "nested <STMTTRN> in transaction {}",
                        records.len() + 1
                    )));
                }
                current = Some(PendingTransaction::default());
                last_open = None;
            }
            Token::Close(tag) if tag.eq_ignore_ascii_case("STMTTRN") => {
                let pending = current.take().ok_or_else(|| {
                    Error::ParseError("</STMTTRN> without matching <STMTTRN>".to_string())
                })?;
                records.push(pending.finish(records.len())?);
                last_open = None;
            }
            Token::Open(tag) => last_open = Some(tag),
            Token::Close(_) => last_open = None,
            Token::Text(value) => {
                let value = value.trim();
                if let (Some(pending), Some(tag)) = (current.as_mut(), last_open) {
                    if !value.is_empty() {
                        pending.set(tag, value);
                    }
                }
                last_open = None;
            }
        }
    }

    if current.is_some() {
        return Err(Error::ParseError(format!(
            "unterminated <STMTTRN> in transaction {}",
            records.len() + 1
        )));
    }

    Ok(records)
}

/// Parse an OFX date (`YYYYMMDD[HHMMSS[.XXX]][[offset:TZ]]`), keeping the day.
fn parse_ofx_date(date_str: &str) -> Result<NaiveDate> {
    let digits = date_str
        .get(0..8)
        .filter(|d| d.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| Error::InvalidDate(date_str.to_string()))?;

    NaiveDate::parse_from_str(digits, "%Y%m%d").map_err(|_| Error::InvalidDate(date_str.to_string()))
}

fn parse_ofx_amount(amount_str: &str) -> Result<Decimal> {
    let cleaned = amount_str
        .trim()
        .trim_start_matches('+')
        .replace(' ', "")
        .replace(',', ".");

    Decimal::from_str(&cleaned).map_err(|_| Error::InvalidAmount(amount_str.to_string()))
}

/// Format a date as an OFX timestamp at midnight.
fn format_ofx_date(date: &NaiveDate) -> String {
    format!("{}000000", date.format("%Y%m%d"))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<").replace("&gt;", ">").replace("&amp;", "&")
}
