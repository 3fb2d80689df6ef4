use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::Ambiente;
use crate::cpq::pricing::{price_line, round_money, total_discount};
use crate::domain::client::{Client, ClientAddress};
use crate::domain::quote::{Quote, QuoteItem};
use crate::errors::DomainError;
use crate::dte::words::amount_in_words;

/// Factura (consumidor final).
pub const TIPO_DTE_FACTURA: &str = "01";
pub const DTE_VERSION: u8 = 1;
/// Unit code 59, "Unidad".
pub const DEFAULT_UNI_MEDIDA: u16 = 59;
/// Contado.
pub const CONDICION_CONTADO: u8 = 1;
const EL_SALVADOR_UTC_OFFSET_HOURS: i64 = 6;

/// Wall-clock time in El Salvador (UTC-06:00, no daylight saving).
pub fn el_salvador_local(now: DateTime<Utc>) -> NaiveDateTime {
    (now - Duration::hours(EL_SALVADOR_UTC_OFFSET_HOURS)).naive_utc()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DtePayload {
    pub identificacion: Identificacion,
    pub receptor: Receptor,
    pub cuerpo_documento: Vec<CuerpoItem>,
    pub resumen: Resumen,
    pub extension: Extension,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identificacion {
    pub version: u8,
    pub ambiente: String,
    pub tipo_dte: String,
    pub tipo_modelo: u8,
    pub tipo_operacion: u8,
    pub tipo_moneda: String,
    pub fec_emi: String,
    pub hor_emi: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receptor {
    pub tipo_documento: String,
    pub num_documento: String,
    pub nrc: Option<String>,
    pub nombre: String,
    pub cod_actividad: Option<String>,
    pub desc_actividad: Option<String>,
    pub direccion: ClientAddress,
    pub telefono: Option<String>,
    pub correo: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuerpoItem {
    pub num_item: u32,
    pub tipo_item: u8,
    pub numero_documento: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub cantidad: Decimal,
    pub codigo: Option<String>,
    pub cod_tributo: Option<String>,
    pub uni_medida: u16,
    pub descripcion: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub precio_uni: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub monto_descu: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub venta_no_suj: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub venta_exenta: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub venta_gravada: Decimal,
    pub tributos: Option<Vec<String>>,
    #[serde(with = "rust_decimal::serde::float")]
    pub psv: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub no_gravado: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub iva_item: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resumen {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_no_suj: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_exenta: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_gravada: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub sub_total_ventas: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_descu: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub sub_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_iva: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub monto_total_operacion: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_no_gravado: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_pagar: Decimal,
    pub total_letras: String,
    pub condicion_operacion: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub observaciones: String,
}

/// Assembles the Factura body for an approved quote.
#[derive(Clone, Debug)]
pub struct DtePayloadBuilder {
    ambiente: Ambiente,
    issued_at: DateTime<Utc>,
}

impl DtePayloadBuilder {
    pub fn new(ambiente: Ambiente) -> Self {
        Self { ambiente, issued_at: Utc::now() }
    }

    pub fn issued_at(mut self, issued_at: DateTime<Utc>) -> Self {
        self.issued_at = issued_at;
        self
    }

    /// `items` must be the parsed form of `quote.items`. The summary reuses the
    /// quote's stored totals rather than recomputing them.
    pub fn build(
        &self,
        quote: &Quote,
        client: &Client,
        items: &[QuoteItem],
    ) -> Result<DtePayload, DomainError> {
        let local = el_salvador_local(self.issued_at);
        let identificacion = Identificacion {
            version: DTE_VERSION,
            ambiente: self.ambiente.code().to_string(),
            tipo_dte: TIPO_DTE_FACTURA.to_string(),
            tipo_modelo: 1,
            tipo_operacion: 1,
            tipo_moneda: "USD".to_string(),
            fec_emi: local.format("%Y-%m-%d").to_string(),
            hor_emi: local.format("%H:%M:%S").to_string(),
        };

        let receptor = Receptor {
            tipo_documento: client.tipo_documento.clone(),
            num_documento: client.num_documento.clone(),
            nrc: client.nrc.clone(),
            nombre: client.nombre.clone(),
            cod_actividad: client.cod_actividad.clone(),
            desc_actividad: client.desc_actividad.clone(),
            direccion: ClientAddress::parse_stored(&client.direccion),
            telefono: client.telefono.clone(),
            correo: client.correo.clone(),
        };

        let cuerpo_documento = items
            .iter()
            .enumerate()
            .map(|(index, item)| cuerpo_item(index, item))
            .collect::<Result<Vec<_>, _>>()?;

        let totals = quote.totals;
        let resumen = Resumen {
            total_no_suj: Decimal::ZERO,
            total_exenta: Decimal::ZERO,
            total_gravada: totals.subtotal,
            sub_total_ventas: totals.subtotal,
            total_descu: total_discount(items)?,
            sub_total: totals.subtotal,
            total_iva: totals.tax_amount,
            monto_total_operacion: totals.total,
            total_no_gravado: Decimal::ZERO,
            total_pagar: totals.total,
            total_letras: amount_in_words(totals.total)?,
            condicion_operacion: CONDICION_CONTADO,
        };

        let observaciones = match quote.notes.as_deref().map(str::trim) {
            Some(notes) if !notes.is_empty() => {
                format!("Cotización {}. {notes}", quote.quote_number)
            }
            _ => format!("Cotización {}", quote.quote_number),
        };

        Ok(DtePayload {
            identificacion,
            receptor,
            cuerpo_documento,
            resumen,
            extension: Extension { observaciones },
        })
    }
}

fn cuerpo_item(index: usize, item: &QuoteItem) -> Result<CuerpoItem, DomainError> {
    let line = price_line(item)?;
    Ok(CuerpoItem {
        num_item: index as u32 + 1,
        tipo_item: item.tipo_item,
        numero_documento: None,
        cantidad: item.cantidad,
        codigo: item.codigo.clone(),
        cod_tributo: None,
        uni_medida: DEFAULT_UNI_MEDIDA,
        descripcion: item.descripcion.clone(),
        precio_uni: item.precio_unitario,
        monto_descu: item.descuento,
        venta_no_suj: Decimal::ZERO,
        venta_exenta: Decimal::ZERO,
        venta_gravada: round_money(line.venta_gravada),
        tributos: None,
        psv: Decimal::ZERO,
        no_gravado: Decimal::ZERO,
        iva_item: round_money(line.iva_item),
    })
}
