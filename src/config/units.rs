use std::time::Duration;

/// Longest suffixes first so `Mi` is not read as `M`.
const MEMORY_SUFFIXES: [(&str, i64); 8] = [
    ("Ti", 1 << 40),
    ("Gi", 1 << 30),
    ("Mi", 1 << 20),
    ("Ki", 1 << 10),
    ("T", 1_000_000_000_000),
    ("G", 1_000_000_000),
    ("M", 1_000_000),
    ("K", 1_000),
];

/// Reads a container memory limit such as `2Gi`, `512M` or a raw byte count.
pub(crate) fn parse_memory_string(s: &str) -> Result<i64, String> {
    let s = s.trim();

    if let Ok(bytes) = s.parse::<i64>() {
        return Ok(bytes);
    }

    let (amount, multiplier) = MEMORY_SUFFIXES
        .iter()
        .find_map(|(suffix, multiplier)| s.strip_suffix(suffix).map(|amount| (amount, *multiplier)))
        .ok_or_else(|| format!("Invalid memory format: {}", s))?;

    let value: f64 = amount
        .parse()
        .map_err(|_| format!("Invalid numeric value in memory string: {}", s))?;

    Ok((value * multiplier as f64) as i64)
}

pub(crate) fn parse_duration(duration_str: &str) -> Result<Duration, String> {
    let duration_str = duration_str.trim();

    let (digits, unit) = if let Some(digits) = duration_str.strip_suffix("ms") {
        (digits, 1)
    } else if let Some(digits) = duration_str.strip_suffix('s') {
        (digits, 1_000)
    } else if let Some(digits) = duration_str.strip_suffix('m') {
        (digits, 60_000)
    } else if let Some(digits) = duration_str.strip_suffix('h') {
        (digits, 3_600_000)
    } else {
        return Err(format!("Invalid duration format: {}", duration_str));
    };

    let value = digits
        .parse::<u64>()
        .map_err(|_| format!("Invalid duration format: {}", duration_str))?;

    let millis = value
        .checked_mul(unit)
        .ok_or_else(|| format!("Invalid duration format: {}", duration_str))?;

    Ok(Duration::from_millis(millis))
}
