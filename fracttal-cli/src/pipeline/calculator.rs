//! Delta calculation for a report row
//!
//! Vehicles report distance in kilometres, machinery reports running time as
//! `H:MM`. Anything that cannot be read becomes a zero delta, which the
//! pipeline skips.

use serde::Deserialize;

use crate::report::ReportRow;

/// Unit of the delta added to an asset's meter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterUnit {
    Km,
    Horas,
    Desconocido,
}

impl std::fmt::Display for MeterUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeterUnit::Km => write!(f, "Km"),
            MeterUnit::Horas => write!(f, "Horas"),
            MeterUnit::Desconocido => write!(f, "Desconocido"),
        }
    }
}

/// Which categories are metered by distance and which by running time
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CategoryRules {
    pub distance: Vec<String>,
    pub running_time: Vec<String>,
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self {
            distance: vec!["Flota Liviana".to_string(), "Camiones".to_string()],
            running_time: vec!["Maquinarias".to_string()],
        }
    }
}

impl CategoryRules {
    pub fn unit_for(&self, category: &str) -> MeterUnit {
        let category = category.trim();
        if category.is_empty() {
            MeterUnit::Desconocido
        } else if self.distance.iter().any(|c| c == category) {
            MeterUnit::Km
        } else if self.running_time.iter().any(|c| c == category) {
            MeterUnit::Horas
        } else {
            MeterUnit::Desconocido
        }
    }
}

/// Amount to add to the asset's meter and the unit it is expressed in.
///
/// Never fails: unreadable values and unknown categories give a zero delta.
pub fn calculate_value_to_add(row: &ReportRow, rules: &CategoryRules) -> (f64, MeterUnit) {
    let unit = rules.unit_for(&row.category);
    let delta = match unit {
        MeterUnit::Km => parse_distance(&row.distance_km),
        MeterUnit::Horas => parse_running_time(&row.running_time),
        MeterUnit::Desconocido => None,
    };
    (delta.unwrap_or(0.0), unit)
}

/// Kilometres with either `.` or `,` as decimal separator
pub fn parse_distance(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// `H:MM` (seconds, if present, are ignored) to decimal hours
pub fn parse_running_time(raw: &str) -> Option<f64> {
    let mut parts = raw.trim().split(':');
    let hours = parts.next()?.trim().parse::<i64>().ok()?;
    let minutes = parts.next()?.trim().parse::<i64>().ok()?;
    Some(hours as f64 + minutes as f64 / 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(category: &str, distance: &str, running_time: &str) -> ReportRow {
        ReportRow {
            internal_code: "ER-1".to_string(),
            category: category.to_string(),
            distance_km: distance.to_string(),
            running_time: running_time.to_string(),
            ..ReportRow::default()
        }
    }

    fn calc(r: &ReportRow) -> (f64, MeterUnit) {
        calculate_value_to_add(r, &CategoryRules::default())
    }

    #[test]
    fn test_distance_categories() {
        assert_eq!(calc(&row("Camiones", "123,5", "")), (123.5, MeterUnit::Km));
        assert_eq!(calc(&row("Flota Liviana", "123.5", "")), (123.5, MeterUnit::Km));
        assert_eq!(calc(&row("Camiones", "50", "9:00")), (50.0, MeterUnit::Km));
        assert_eq!(calc(&row(" Camiones ", " 12 ", "")), (12.0, MeterUnit::Km));
    }

    #[test]
    fn test_unparsable_distance_is_zero_km() {
        assert_eq!(calc(&row("Camiones", "abc", "")), (0.0, MeterUnit::Km));
        assert_eq!(calc(&row("Camiones", "", "")), (0.0, MeterUnit::Km));
        assert_eq!(calc(&row("Camiones", "nan", "")), (0.0, MeterUnit::Km));
        assert_eq!(calc(&row("Camiones", "1.234,5", "")), (0.0, MeterUnit::Km));
    }

    #[test]
    fn test_running_time() {
        assert_eq!(calc(&row("Maquinarias", "", "2:30")), (2.5, MeterUnit::Horas));
        assert_eq!(calc(&row("Maquinarias", "", "0:00")), (0.0, MeterUnit::Horas));
        assert_eq!(calc(&row("Maquinarias", "", "1:45")), (1.75, MeterUnit::Horas));
        assert_eq!(calc(&row("Maquinarias", "", "12:15:40")), (12.25, MeterUnit::Horas));
        assert_eq!(calc(&row("Maquinarias", "999", "")), (0.0, MeterUnit::Horas));
    }

    #[test]
    fn test_malformed_running_time_is_zero_hours() {
        for raw in ["abc", "", "nan", "3", "a:30", "2:xx", ":"] {
            assert_eq!(
                calc(&row("Maquinarias", "", raw)),
                (0.0, MeterUnit::Horas),
                "input {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_unknown_category() {
        assert_eq!(calc(&row("", "50", "1:00")), (0.0, MeterUnit::Desconocido));
        assert_eq!(calc(&row("Acoplados", "50", "1:00")), (0.0, MeterUnit::Desconocido));
        assert_eq!(calc(&row("camiones", "50", "")), (0.0, MeterUnit::Desconocido));
    }

    #[test]
    fn test_custom_rules() {
        let rules = CategoryRules {
            distance: vec!["Utilitarios".to_string()],
            running_time: vec!["Generadores".to_string()],
        };
        assert_eq!(
            calculate_value_to_add(&row("Utilitarios", "10,5", ""), &rules),
            (10.5, MeterUnit::Km)
        );
        assert_eq!(
            calculate_value_to_add(&row("Generadores", "", "0:30"), &rules),
            (0.5, MeterUnit::Horas)
        );
        assert_eq!(
            calculate_value_to_add(&row("Camiones", "10", ""), &rules).1,
            MeterUnit::Desconocido
        );
    }

    #[test]
    fn test_unit_display() {
        assert_eq!(MeterUnit::Km.to_string(), "Km");
        assert_eq!(MeterUnit::Horas.to_string(), "Horas");
        assert_eq!(MeterUnit::Desconocido.to_string(), "Desconocido");
    }
}
