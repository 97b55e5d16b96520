use conversor::conversion::{read_statement, read_table};
use conversor::csv_format::CsvTable;
use conversor::ofx_format::OfxStatement;
use conversor::{convert, ConversionOutput, Error, Format, TransactionRecord};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use tempfile::TempDir;

const STATEMENT: &str = "OFXHEADER:100
DATA:OFXSGML
VERSION:102
SECURITY:NONE
ENCODING:USASCII
CHARSET:1252
COMPRESSION:NONE
OLDFILEUID:NONE
NEWFILEUID:NONE

<OFX>
<SIGNONMSGSRSV1><SONRS><STATUS><CODE>0<SEVERITY>INFO</STATUS><DTSERVER>20240201<LANGUAGE>POR</SONRS></SIGNONMSGSRSV1>
<BANKMSGSRSV1><STMTTRNRS><TRNUID>1<STMTRS><CURDEF>BRL
<BANKTRANLIST>
<DTSTART>20240101<DTEND>20240131
<STMTTRN><TRNTYPE>DEBIT<DTPOSTED>20240103<TRNAMT>-120.35<FITID>9001<MEMO>Supermercado</STMTTRN>
<STMTTRN><TRNTYPE>CREDIT<DTPOSTED>20240105<TRNAMT>3200.00<FITID>9002<MEMO>Salario</STMTTRN>
<STMTTRN><TRNTYPE>DEBIT<DTPOSTED>20240120<TRNAMT>-45.9<FITID>9003<MEMO>Farmacia</STMTTRN>
</BANKTRANLIST></STMTRS></STMTTRNRS></BANKMSGSRSV1>
</OFX>
";

fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn sample_records() -> Vec<TransactionRecord> {
    vec![
        TransactionRecord::new(
            NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            "Aluguel",
            Decimal::from_str("-1800.00").unwrap(),
            "1",
        ),
        TransactionRecord::new(
            NaiveDate::from_ymd_opt(2024, 5, 5).unwrap(),
            "Pix João",
            Decimal::from_str("250.5").unwrap(),
            "2",
        ),
        TransactionRecord::new(
            NaiveDate::from_ymd_opt(2024, 5, 9).unwrap(),
            "Padaria \"Pão Quente\"; centro",
            Decimal::from_str("-7.25").unwrap(),
            "",
        ),
        TransactionRecord::new(
            NaiveDate::from_ymd_opt(2024, 5, 12).unwrap(),
            "  Pix  ",
            Decimal::from_str("-50.00").unwrap(),
            "4",
        ),
    ]
}

#[test]
fn statement_round_trip_keeps_amounts_and_descriptions() {
    let first = OfxStatement::from_bytes(STATEMENT.as_bytes()).unwrap();
    let text = first.to_ofx_string().unwrap();
    let second = OfxStatement::from_bytes(text.as_bytes()).unwrap();

    assert_eq!(first.records.len(), 3);
    assert_eq!(second.records.len(), first.records.len());
    for (a, b) in first.records.iter().zip(&second.records) {
        assert_eq!(a.amount, b.amount);
        assert_eq!(a.description, b.description);
        assert_eq!(a.date, b.date);
    }
}

#[test]
fn table_round_trip_keeps_values() {
    let records = sample_records();
    let text = CsvTable { records: records.clone() }.to_csv_string().unwrap();
    let parsed = CsvTable::from_bytes(text.as_bytes()).unwrap().records;

    assert_eq!(parsed.len(), records.len());
    for (a, b) in records.iter().zip(&parsed) {
        assert_eq!(a.date, b.date);
        assert_eq!(a.description, b.description);
        assert_eq!(a.amount, b.amount);
    }
}

#[test]
fn negative_amounts_with_currency_prefix_are_read() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "moeda.csv",
        "data;descricao;valor\n01/02/2024;Tarifa;-R$ 50,00\n02/02/2024;Estorno;R$ -1.250,10\n".as_bytes(),
    );

    let records = read_table(&path).unwrap();
    assert_eq!(records[0].amount, Decimal::from_str("-50.00").unwrap());
    assert_eq!(records[1].amount, Decimal::from_str("-1250.10").unwrap());
}

#[test]
fn two_digit_years_fail_the_table() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "curto.csv", b"data;descricao;valor
05/01/24;Cafe;1,00
");

    match read_table(&path) {
        Err(Error::ValidationError { line, column, value, .. }) => {
            assert_eq!(line, 2);
            assert_eq!(column, "data");
            assert_eq!(value, "05/01/24");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(convert(&path, Format::Csv, Format::Ofx).is_err());
}

#[test]
fn empty_table_to_statement_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "vazio.csv", b"data;descricao;valor\n");
    assert!(matches!(convert(&path, Format::Csv, Format::Ofx), Err(Error::EmptyInput)));
}

#[test]
fn misdeclared_encoding_falls_back() {
    // Windows-1252 accents under a 7-bit ASCII declaration.
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"OFXHEADER:100\nDATA:OFXSGML\nVERSION:102\nENCODING:USASCII\nCHARSET:NONE\n\n");
    bytes.extend_from_slice(b"<OFX><BANKTRANLIST><STMTTRN><DTPOSTED>20240310<TRNAMT>-9.99");
    bytes.extend_from_slice(b"<FITID>X<MEMO>Caf\xE9 da Esta\xE7\xE3o</STMTTRN></BANKTRANLIST></OFX>");

    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "latin.ofx", &bytes);
    let records = read_statement(&path).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].description, "Café da Estação");
}

#[test]
fn unreadable_statement_reports_both_causes() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "broken.ofx",
        b"ENCODING:USASCII\n\n<OFX><STMTTRN><DTPOSTED>2024\xE9<TRNAMT>1</STMTTRN></OFX>",
    );

    match read_statement(&path).unwrap_err() {
        Error::StatementParse { strict, fallback } => {
            assert!(strict.contains("US-ASCII"), "{strict}");
            assert!(fallback.contains("date"), "{fallback}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn table_without_amount_column_names_it() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "sem_valor.csv", b"data;descricao\n01/02/2024;Cafe\n");

    let err = read_table(&path).unwrap_err();
    assert!(matches!(&err, Error::SchemaError { missing } if missing.len() == 1));
    assert!(err.to_string().contains("amount"));
    assert!(err.to_string().contains("valor"));
}

#[test]
fn table_with_bad_amount_fails_entirely() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "ruim.csv",
        b"data;descricao;valor\n01/02/2024;Cafe;5,00\n02/02/2024;Pao;abc\n03/02/2024;Leite;4,50\n",
    );

    assert!(matches!(read_table(&path), Err(Error::ValidationError { .. })));
    assert!(matches!(convert(&path, Format::Csv, Format::Pdf), Err(Error::ValidationError { .. })));
}

#[test]
fn statement_converts_to_table_markup_and_report() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "extrato.ofx", STATEMENT.as_bytes());

    match convert(&path, Format::Ofx, Format::Csv).unwrap() {
        ConversionOutput::Text(csv) => {
            assert_eq!(csv.lines().next(), Some("data;descricao;valor;id"));
            assert!(csv.contains("2024-01-03;Supermercado;-120,35;9001"));
        }
        other => panic!("unexpected output: {other:?}"),
    }

    match convert(&path, Format::Ofx, Format::Xml).unwrap() {
        ConversionOutput::Text(xml) => {
            assert!(xml.contains("<Data>2024-01-05</Data>"));
            assert!(xml.contains("<ID>9002</ID>"));
        }
        other => panic!("unexpected output: {other:?}"),
    }

    match convert(&path, Format::Ofx, Format::Pdf).unwrap() {
        ConversionOutput::Bytes(pdf) => assert!(pdf.starts_with(b"%PDF-")),
        other => panic!("unexpected output: {other:?}"),
    }
}

#[test]
fn table_converts_to_statement() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "extrato.csv",
        "data;descricao;valor;id\n15/03/2024;Mercado;-80,10;a\n01/03/2024;Salário;R$ 5.000,00;b\n".as_bytes(),
    );

    let text = match convert(&path, Format::Csv, Format::Ofx).unwrap() {
        ConversionOutput::Text(text) => text,
        other => panic!("unexpected output: {other:?}"),
    };
    assert!(text.contains("<DTSTART>20240301000000</DTSTART>"));
    assert!(text.contains("<DTEND>20240315000000</DTEND>"));
    assert!(text.contains("<TRNAMT>5000.00</TRNAMT>"));
    assert!(text.contains("<FITID>202403150</FITID>"));

    let records = OfxStatement::from_bytes(text.as_bytes()).unwrap().records;
    assert_eq!(records[1].description, "Salário");
}

#[test]
fn non_image_renamed_jpg_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "recibo.jpg", b"this is plain text, not a picture");

    match convert(&path, Format::Jpg, Format::Pdf) {
        Err(Error::InvalidImage { file }) => assert_eq!(file, "recibo.jpg"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn markup_sources_are_never_converted() {
    let dir = TempDir::new().unwrap();
    let existing = write_file(&dir, "extrato.xml", b"<ExtratoOFX/>");
    let missing = dir.path().join("nao_existe.xml");

    for path in [existing, missing] {
        for to in Format::ALL {
            assert!(matches!(
                convert(&path, Format::Xml, to),
                Err(Error::UnsupportedConversion { from: Format::Xml, .. })
            ));
        }
    }
    assert!(matches!(
        convert(dir.path().join("x.csv"), Format::Csv, Format::Xml),
        Err(Error::UnsupportedConversion { .. })
    ));
}

#[test]
fn multi_page_report_renders_one_image_per_page() {
    let pdfium = match pdfium_render::prelude::Pdfium::bind_to_system_library() {
        Ok(bindings) => pdfium_render::prelude::Pdfium::new(bindings),
        Err(_) => {
            eprintln!("pdfium not available, skipping");
            return;
        }
    };

    let records: Vec<TransactionRecord> = (0..120)
        .map(|i| {
            TransactionRecord::new(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i),
                format!("Lancamento {}", i),
                Decimal::new(i * 100 + 5, 2),
                i.to_string(),
            )
        })
        .collect();
    let report = conversor::report_format::write_report(&records, "Relatório").unwrap();
    let expected_pages = pdfium
        .load_pdf_from_byte_slice(&report, None)
        .unwrap()
        .pages()
        .len() as usize;
    assert!(expected_pages > 1);

    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "relatorio.pdf", &report);
    let output = convert(&path, Format::Pdf, Format::Jpg).unwrap();

    let written = output.save(dir.path().join("relatorio.jpg")).unwrap();
    assert_eq!(written.len(), expected_pages);
    assert_eq!(written[0].file_name().unwrap(), "relatorio_pagina_1.jpg");
    for page in &written {
        let decoded = image::load_from_memory(&fs::read(page).unwrap()).unwrap();
        let (width, height) = image::GenericImageView::dimensions(&decoded);
        assert!(width > 0);
        assert!(height > width, "letter pages are portrait: {width}x{height}");
    }
}
