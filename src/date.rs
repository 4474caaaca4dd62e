use chrono::{DateTime, Datelike, FixedOffset, Utc};

const PT_BR_MONTHS: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::<FixedOffset>::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .or_else(|_| DateTime::<FixedOffset>::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

pub fn format_pt_br(date: &DateTime<Utc>) -> String {
    let month = PT_BR_MONTHS[date.month0() as usize];
    format!("{:02} {} {:04}", date.day(), month, date.year())
}

pub fn display_publication_date(raw: Option<&str>) -> String {
    match raw.and_then(parse_timestamp) {
        Some(date) => format_pt_br(&date),
        None => {
            if let Some(raw) = raw {
                tracing::debug!(raw, "unparsable publication date");
            }
            String::new()
        }
    }
}
