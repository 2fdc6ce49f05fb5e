//! Parsing for Kubernetes resource [`Quantity`] strings
//!
//! Grounded on the bounds-checked `cpu()`/`storage()` parsers this workspace
//! already carries for its own k8s scheduler, adapted to the CCS's floating
//! point cores/gigabyte units instead of millicores/mebibytes.
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use regex::Regex;

use crate::error::Error;

/// Parse a [`Quantity`] into its plain numeric value, applying any SI or
/// binary suffix (`m`, `K`/`M`/`G`/`T`/`P`/`E`, `Ki`/`Mi`/`Gi`/`Ti`/`Pi`/`Ei`).
///
/// The result is in the quantity's natural base unit: cores for a CPU
/// quantity, bytes for a memory quantity.
pub fn to_base_units(raw: &Quantity) -> Result<f64, Error> {
    let raw = &raw.0;
    // plain numbers are already in base units (whole cores, whole bytes)
    if let Ok(value) = raw.parse::<f64>() {
        return Ok(value);
    }
    // milli-suffixed values (cpu "500m" -> 0.5 cores)
    if let Some(stripped) = raw.strip_suffix('m') {
        let millis: f64 = stripped
            .parse()
            .map_err(|_| Error::validation(format!("invalid quantity: {raw}")))?;
        return Ok(millis / 1000.0);
    }
    // everything else is a SI or binary suffixed memory-style value
    let unit_regex = Regex::new(r"^(Ki|Mi|Gi|Ti|Pi|Ei|K|M|G|T|P|E)$")
        .expect("quantity suffix regex is a static, valid pattern");
    let split_at = raw
        .char_indices()
        .find(|(_, c)| c.is_alphabetic())
        .map(|(idx, _)| idx)
        .ok_or_else(|| Error::validation(format!("failed to parse quantity: {raw}")))?;
    let (amount, unit) = raw.split_at(split_at);
    if !unit_regex.is_match(unit) {
        return Err(Error::validation(format!(
            "unsupported quantity suffix in: {raw}"
        )));
    }
    let amount: f64 = amount
        .parse()
        .map_err(|_| Error::validation(format!("invalid quantity: {raw}")))?;
    let scaled = match unit {
        "K" => amount * 1_000.0,
        "M" => amount * 1_000_000.0,
        "G" => amount * 1_000_000_000.0,
        "T" => amount * 1_000_000_000_000.0,
        "P" => amount * 1_000_000_000_000_000.0,
        "E" => amount * 1_000_000_000_000_000_000.0,
        "Ki" => amount * 1_024.0,
        "Mi" => amount * 1_024.0 * 1_024.0,
        "Gi" => amount * 1_024.0 * 1_024.0 * 1_024.0,
        "Ti" => amount * 1_024.0_f64.powi(4),
        "Pi" => amount * 1_024.0_f64.powi(5),
        "Ei" => amount * 1_024.0_f64.powi(6),
        _ => unreachable!("unit already validated against unit_regex"),
    };
    Ok(scaled)
}

/// Truncate (not round) `value` to `places` decimal digits
pub fn truncate(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).trunc() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_number_is_base_units() {
        assert_eq!(to_base_units(&Quantity("2".to_owned())).unwrap(), 2.0);
    }

    #[test]
    fn milli_suffix_divides_by_1000() {
        let cores = to_base_units(&Quantity("1981m".to_owned())).unwrap();
        assert!((cores - 1.981).abs() < 1e-9);
    }

    #[test]
    fn decimal_giga_suffix() {
        let bytes = to_base_units(&Quantity("3.49G".to_owned())).unwrap();
        assert!((bytes - 3_490_000_000.0).abs() < 1.0);
    }

    #[test]
    fn binary_gibi_suffix() {
        let bytes = to_base_units(&Quantity("1Gi".to_owned())).unwrap();
        assert_eq!(bytes, 1_073_741_824.0);
    }

    #[test]
    fn unsupported_suffix_errors() {
        assert!(to_base_units(&Quantity("4Zz".to_owned())).is_err());
    }

    #[test]
    fn truncate_does_not_round() {
        assert_eq!(truncate(1.986, 2), 1.98);
        assert_eq!(truncate(3.49, 1), 3.4);
    }
}
