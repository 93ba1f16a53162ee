/// Generate a compact correlation ID (8 hex characters) from the first 4 bytes of a UUID v4.
pub fn generate_correlation_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    let bytes = uuid.as_bytes();
    format!(
        "{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3]
    )
}

/// Render attacker-supplied text for a single log line: control bytes are
/// escaped and the result is capped at `max` characters.
pub fn sanitize_for_log(input: &str, max: usize) -> String {
    let mut out = String::with_capacity(input.len().min(max));
    for (count, c) in input.chars().enumerate() {
        if count >= max {
            out.push('…');
            break;
        }
        if c.is_control() {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    out
}
