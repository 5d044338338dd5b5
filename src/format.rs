//! Display formatting for costs, durations, token counts, timestamps and ids.

use chrono::{DateTime, Local, Utc};

/// Costs under a cent are shown in millidollars (`$1.50m`).
pub fn format_cost(cost_usd: f64) -> String {
    if cost_usd < 0.01 {
        format!("${:.2}m", cost_usd * 1000.0)
    } else {
        format!("${cost_usd:.4}")
    }
}

pub fn format_cost_summary(cost_usd: f64) -> String {
    if cost_usd == 0.0 {
        "Free".to_string()
    } else if cost_usd < 0.01 {
        "< $0.01".to_string()
    } else {
        format!("${cost_usd:.2}")
    }
}

pub fn format_duration(duration_ms: f64) -> String {
    let seconds = (duration_ms.max(0.0) / 1000.0).floor() as u64;
    let minutes = seconds / 60;
    let hours = minutes / 60;

    if hours > 0 {
        format!("{hours}h {}m {}s", minutes % 60, seconds % 60)
    } else if minutes > 0 {
        format!("{minutes}m {}s", seconds % 60)
    } else {
        format!("{seconds}s")
    }
}

pub fn format_tokens(tokens: u64) -> String {
    if tokens < 1_000 {
        tokens.to_string()
    } else if tokens < 1_000_000 {
        format!("{:.1}K", tokens as f64 / 1_000.0)
    } else {
        format!("{:.1}M", tokens as f64 / 1_000_000.0)
    }
}

pub fn parse_timestamp(timestamp: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(timestamp.trim())
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

pub fn format_date(timestamp: &str) -> String {
    match parse_timestamp(timestamp) {
        Some(parsed) => parsed.with_timezone(&Local).format("%b %-d, %Y").to_string(),
        None => timestamp.to_string(),
    }
}

pub fn format_date_time(timestamp: &str) -> String {
    match parse_timestamp(timestamp) {
        Some(parsed) => parsed
            .with_timezone(&Local)
            .format("%b %-d, %Y, %I:%M %p")
            .to_string(),
        None => timestamp.to_string(),
    }
}

/// `just now`, `5m ago`, `3h ago`, `2d ago`, then a plain date after a week.
pub fn format_relative_time(timestamp: &str, now: DateTime<Utc>) -> String {
    let Some(parsed) = parse_timestamp(timestamp) else {
        return timestamp.to_string();
    };
    let minutes = (now - parsed).num_minutes();
    let hours = minutes / 60;
    let days = hours / 24;

    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if days < 7 {
        format!("{days}d ago")
    } else {
        format_date(timestamp)
    }
}

pub fn format_model_name(model: &str) -> &str {
    match model {
        "claude-3-5-sonnet-20241022" => "Claude 3.5 Sonnet",
        "claude-3-5-haiku-20241022" => "Claude 3.5 Haiku",
        "claude-3-opus-20240229" => "Claude 3 Opus",
        other => other,
    }
}

/// Shortens a path to `max_len` characters, keeping the file name and as
/// many leading directories as fit.
pub fn format_path(path: &str, max_len: usize) -> String {
    let length = path.chars().count();
    if length <= max_len {
        return path.to_string();
    }

    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() <= 2 {
        let keep = max_len.saturating_sub(3);
        let tail: String = path.chars().skip(length.saturating_sub(keep)).collect();
        return format!("...{tail}");
    }

    let file_name = parts[parts.len() - 1];
    let budget = max_len as isize - file_name.chars().count() as isize - 4;
    if budget <= 0 {
        return format!(".../{file_name}");
    }

    let mut result = parts[0].to_string();
    for part in &parts[1..parts.len() - 1] {
        let next = format!("/{part}");
        if (result.chars().count() + next.chars().count()) as isize <= budget {
            result.push_str(&next);
        } else {
            result.push_str("/...");
            break;
        }
    }
    format!("{result}/{file_name}")
}

/// Cuts to `max_len` characters, the last three being `...`.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_len.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// First 8 characters of a session id.
pub fn format_session_id(session_id: &str) -> String {
    session_id.chars().take(8).collect()
}

/// Last 8 characters of an id, as shown on tool panels.
pub fn short_id(id: &str) -> String {
    let length = id.chars().count();
    id.chars().skip(length.saturating_sub(8)).collect()
}

/// Completion summary for a finished run: `Cost: $0.0500 | Duration: 2s`.
pub fn result_summary(cost_usd: Option<f64>, duration_ms: Option<f64>) -> String {
    let cost = match cost_usd {
        Some(cost) if cost != 0.0 => format!("{cost:.4}"),
        _ => "0".to_string(),
    };
    let seconds = (duration_ms.unwrap_or(0.0) / 1000.0).round() as i64;
    format!("Cost: ${cost} | Duration: {seconds}s")
}
