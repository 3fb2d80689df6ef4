use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::cpq::pricing::round_money;
use crate::errors::DomainError;

const UNITS: [&str; 10] =
    ["", "UNO", "DOS", "TRES", "CUATRO", "CINCO", "SEIS", "SIETE", "OCHO", "NUEVE"];
const TEENS: [&str; 10] = [
    "DIEZ",
    "ONCE",
    "DOCE",
    "TRECE",
    "CATORCE",
    "QUINCE",
    "DIECISEIS",
    "DIECISIETE",
    "DIECIOCHO",
    "DIECINUEVE",
];
const TWENTIES: [&str; 10] = [
    "VEINTE",
    "VEINTIUNO",
    "VEINTIDOS",
    "VEINTITRES",
    "VEINTICUATRO",
    "VEINTICINCO",
    "VEINTISEIS",
    "VEINTISIETE",
    "VEINTIOCHO",
    "VEINTINUEVE",
];
const TENS: [&str; 10] =
    ["", "", "", "TREINTA", "CUARENTA", "CINCUENTA", "SESENTA", "SETENTA", "OCHENTA", "NOVENTA"];
const HUNDREDS: [&str; 10] = [
    "",
    "CIENTO",
    "DOSCIENTOS",
    "TRESCIENTOS",
    "CUATROCIENTOS",
    "QUINIENTOS",
    "SEISCIENTOS",
    "SETECIENTOS",
    "OCHOCIENTOS",
    "NOVECIENTOS",
];

/// Long-scale names for successive powers of 1,000,000.
const SCALES: [(&str, &str); 6] = [
    ("MILLON", "MILLONES"),
    ("BILLON", "BILLONES"),
    ("TRILLON", "TRILLONES"),
    ("CUATRILLON", "CUATRILLONES"),
    ("QUINTILLON", "QUINTILLONES"),
    ("SEXTILLON", "SEXTILLONES"),
];

/// Spells a USD amount the way Salvadoran invoices print it:
/// `27.12` becomes `VEINTISIETE 12/100 USD`.
pub fn amount_in_words(amount: Decimal) -> Result<String, DomainError> {
    let rounded = round_money(amount.abs());
    let whole = rounded.trunc();
    let out_of_range =
        || DomainError::AmountOutOfRange(format!("cannot spell amount {amount}"));
    let cents = ((rounded - whole) * Decimal::ONE_HUNDRED)
        .trunc()
        .to_u8()
        .ok_or_else(out_of_range)?;
    let whole = whole.to_u128().ok_or_else(out_of_range)?;

    Ok(format!("{} {cents:02}/100 USD", integer_in_words(whole)))
}

pub fn integer_in_words(value: u128) -> String {
    if value == 0 {
        return "CERO".to_string();
    }

    let mut groups = Vec::new();
    let mut remaining = value;
    while remaining > 0 {
        groups.push(remaining % 1_000_000);
        remaining /= 1_000_000;
    }

    let mut parts = Vec::new();
    for (index, group) in groups.iter().enumerate().rev() {
        let group = *group as u64;
        if group == 0 {
            continue;
        }
        if index == 0 {
            parts.push(below_million(group));
        } else {
            // u128 holds at most seven groups, so `index - 1` stays within SCALES.
            let (singular, plural) = SCALES[index - 1];
            parts.push(scaled(group, singular, plural));
        }
    }

    parts.join(" ")
}

fn below_million(value: u64) -> String {
    let thousands = value / 1_000;
    let rest = value % 1_000;
    let mut parts = Vec::new();
    if thousands == 1 {
        parts.push("MIL".to_string());
    } else if thousands > 1 {
        parts.push(format!("{} MIL", below_thousand(thousands, true)));
    }
    if rest > 0 {
        parts.push(below_thousand(rest, false));
    }
    parts.join(" ")
}

// `value` < 1_000_000; each scale reuses the thousands grouping.
fn scaled(value: u64, singular: &str, plural: &str) -> String {
    if value == 1 {
        return format!("UN {singular}");
    }
    let high = value / 1_000;
    let low = value % 1_000;
    let mut words = Vec::new();
    if high == 1 {
        words.push("MIL".to_string());
    } else if high > 1 {
        words.push(format!("{} MIL", below_thousand(high, true)));
    }
    if low > 0 {
        words.push(below_thousand(low, true));
    }
    format!("{} {plural}", words.join(" "))
}

fn below_thousand(value: u64, apocope: bool) -> String {
    if value == 100 {
        return "CIEN".to_string();
    }

    let hundreds = (value / 100) as usize;
    let remainder = value % 100;
    let mut words = Vec::new();
    if hundreds > 0 {
        words.push(HUNDREDS[hundreds].to_string());
    }
    if remainder > 0 {
        words.push(below_hundred(remainder, apocope));
    }
    words.join(" ")
}

fn below_hundred(value: u64, apocope: bool) -> String {
    let tens = (value / 10) as usize;
    let units = (value % 10) as usize;
    let word = match tens {
        0 => UNITS[units].to_string(),
        1 => TEENS[units].to_string(),
        2 => TWENTIES[units].to_string(),
        _ if units == 0 => TENS[tens].to_string(),
        _ => format!("{} Y {}", TENS[tens], UNITS[units]),
    };

    if apocope && word.ends_with("UNO") {
        word.trim_end_matches('O').to_string()
    } else {
        word
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{amount_in_words, integer_in_words};

    #[test]
    fn spells_invoice_totals() {
        let spell = |amount| amount_in_words(amount).expect("spelled");
        assert_eq!(spell(Decimal::new(2712, 2)), "VEINTISIETE 12/100 USD");
        assert_eq!(spell(Decimal::ZERO), "CERO 00/100 USD");
        assert_eq!(spell(Decimal::new(100_05, 2)), "CIEN 05/100 USD");
        assert_eq!(spell(Decimal::new(1_999, 3)), "DOS 00/100 USD");
    }

    #[test]
    fn spells_billions_and_beyond() {
        assert_eq!(integer_in_words(1_000_000_000_000), "UN BILLON");
        assert_eq!(integer_in_words(1_000_000_000_000_000), "MIL BILLONES");
        assert_eq!(integer_in_words(1_000_000_000_000_000_000), "UN TRILLON");
        assert_eq!(
            integer_in_words(2_000_003_000_000_000_004),
            "DOS TRILLONES TRES BILLONES CUATRO"
        );
        assert_eq!(integer_in_words(21_000_000_000_000_000_000), "VEINTIUN TRILLONES");
    }

    #[test]
    fn largest_decimal_amounts_spell_without_falling_back() {
        let spelled = amount_in_words(Decimal::from_scientific("1e20").expect("decimal"))
            .expect("spelled");
        assert_eq!(spelled, "CIEN TRILLONES 00/100 USD");

        let spelled = amount_in_words(Decimal::MAX).expect("spelled");
        assert!(spelled.starts_with("SETENTA Y NUEVE MIL DOSCIENTOS VEINTIOCHO CUATRILLONES"), "{spelled}");
        assert!(!spelled.starts_with("CERO"));
    }

    #[test]
    fn handles_tens_and_hundreds() {
        assert_eq!(integer_in_words(1), "UNO");
        assert_eq!(integer_in_words(16), "DIECISEIS");
        assert_eq!(integer_in_words(31), "TREINTA Y UNO");
        assert_eq!(integer_in_words(115), "CIENTO QUINCE");
        assert_eq!(integer_in_words(999), "NOVECIENTOS NOVENTA Y NUEVE");
    }

    #[test]
    fn shortens_uno_before_mil_and_millon() {
        assert_eq!(integer_in_words(1_000), "MIL");
        assert_eq!(integer_in_words(21_000), "VEINTIUN MIL");
        assert_eq!(integer_in_words(31_001), "TREINTA Y UN MIL UNO");
        assert_eq!(integer_in_words(1_000_000), "UN MILLON");
        assert_eq!(integer_in_words(2_500_300), "DOS MILLONES QUINIENTOS MIL TRESCIENTOS");
    }
}
