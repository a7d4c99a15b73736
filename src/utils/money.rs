/// ===============================
/// Money & percentage helpers
/// ===============================
///
/// All monetary values in a payout schedule are plain f64 dollars kept
/// rounded to cents at every step, so intermediate math matches the
/// persisted payload exactly.

/// Round to cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parse an operator-entered currency string ("$1,234.50", "12", "-3.2").
///
/// Returns `None` on anything unparseable; callers treat that as
/// "no override provided" and keep the previously computed value.
pub fn parse_money(input: &str) -> Option<f64> {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ','))
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an operator-entered percentage string ("12.5", "12.5 %").
pub fn parse_percent(input: &str) -> Option<f64> {
    let cleaned = input.trim().trim_end_matches('%').trim();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Normalize a job title into the case-insensitive role key used to match
/// receivers against entitlement rows.
pub fn role_key(job_title: &str) -> String {
    job_title.trim().to_lowercase()
}
