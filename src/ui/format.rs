// ============================================================================
// Formatage des nombres pour l'affichage
// ============================================================================

/// Prix en dollars
///
/// Les petits prix gardent plus de décimales (ex: $0.000012)
pub fn format_price(price: Option<f64>) -> String {
    match price {
        None => "N/A".to_string(),
        Some(p) if p >= 1.0 => format!("${}", group_thousands(p, 2)),
        Some(p) if p >= 0.01 => format!("${:.4}", p),
        Some(p) => format!("${:.8}", p),
    }
}

/// Montant abrégé : $1.23T, $45.60B, $7.80M, $12.3K
pub fn format_compact(value: Option<f64>) -> String {
    let v = match value {
        Some(v) => v,
        None => return "N/A".to_string(),
    };

    let abs = v.abs();
    if abs >= 1e12 {
        format!("${:.2}T", v / 1e12)
    } else if abs >= 1e9 {
        format!("${:.2}B", v / 1e9)
    } else if abs >= 1e6 {
        format!("${:.2}M", v / 1e6)
    } else if abs >= 1e3 {
        format!("${:.1}K", v / 1e3)
    } else {
        format!("${:.2}", v)
    }
}

/// Variation signée avec flèche : "▲ +2.50%"
pub fn format_change(change: Option<f64>) -> String {
    match change {
        None => "N/A".to_string(),
        Some(c) => {
            let arrow = if c >= 0.0 { "▲" } else { "▼" };
            format!("{} {:+.2}%", arrow, c)
        }
    }
}

/// Quantité sans devise (offre en circulation)
pub fn format_supply(value: Option<f64>) -> String {
    value
        .map(|v| group_thousands(v, 0))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Séparateur de milliers ("63,250.50")
fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (formatted, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(Some(63250.5)), "$63,250.50");
        assert_eq!(format_price(Some(1.0)), "$1.00");
        assert_eq!(format_price(Some(0.5432)), "$0.5432");
        assert_eq!(format_price(Some(0.000012)), "$0.00001200");
        assert_eq!(format_price(None), "N/A");
    }

    #[test]
    fn test_format_compact() {
        assert_eq!(format_compact(Some(1.25e12)), "$1.25T");
        assert_eq!(format_compact(Some(45.6e9)), "$45.60B");
        assert_eq!(format_compact(Some(7.8e6)), "$7.80M");
        assert_eq!(format_compact(Some(12_345.0)), "$12.3K");
        assert_eq!(format_compact(Some(999.0)), "$999.00");
        assert_eq!(format_compact(None), "N/A");
    }

    #[test]
    fn test_format_change() {
        assert_eq!(format_change(Some(2.5)), "▲ +2.50%");
        assert_eq!(format_change(Some(-1.234)), "▼ -1.23%");
        assert_eq!(format_change(None), "N/A");
    }

    #[test]
    fn test_format_supply() {
        assert_eq!(format_supply(Some(19_700_000.0)), "19,700,000");
        assert_eq!(format_supply(Some(12.0)), "12");
    }
}
