//! Flat XML export of statement transactions.
//!
//! ```text
//! <ExtratoOFX>
//!   <Transacao>
//!     <Data>2024-01-05</Data>
//!     <Descricao>Padaria</Descricao>
//!     <Valor>-45.90</Valor>
//!     <ID>A1</ID>
//!   </Transacao>
//! </ExtratoOFX>
//! ```
//!
//! There is no reader: arbitrary XML has no agreed transaction schema.

use crate::error::{Error, Result};
use crate::types::TransactionRecord;
use quick_xml::se::Serializer;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename = "ExtratoOFX")]
struct ExtratoXml<'a> {
    #[serde(rename = "Transacao")]
    transacoes: Vec<TransacaoXml<'a>>,
}

#[derive(Debug, Serialize)]
struct TransacaoXml<'a> {
    #[serde(rename = "Data")]
    data: String,
    #[serde(rename = "Descricao")]
    descricao: &'a str,
    #[serde(rename = "Valor")]
    valor: String,
    #[serde(rename = "ID")]
    id: &'a str,
}

/// Render records as an `ExtratoOFX` document.
pub fn to_xml_string(records: &[TransactionRecord]) -> Result<String> {
    let document = ExtratoXml {
        transacoes: records
            .iter()
            .map(|record| TransacaoXml {
                data: record.date.format("%Y-%m-%d").to_string(),
                descricao: &record.description,
                valor: record.amount.to_string(),
                id: &record.id,
            })
            .collect(),
    };

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let mut serializer = Serializer::new(&mut xml);
    serializer.indent(' ', 2);
    document
        .serialize(serializer)
        .map_err(|e| Error::XmlError(e.to_string()))?;

    Ok(xml)
}
