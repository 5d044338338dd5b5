use super::reconcile::TranscriptEntry;
use crate::format::parse_timestamp;
use chrono::{DateTime, SecondsFormat, Utc};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    User,
    Agent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupHeader {
    pub kind: GroupKind,
    /// Sum over members that have a cost; `None` when none do.
    pub total_cost: Option<f64>,
    pub total_duration_ms: Option<f64>,
    pub latest_timestamp: String,
}

/// A user entry alone, or a maximal run of consecutive non-user entries.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageGroup<'a> {
    pub header: GroupHeader,
    pub entries: Vec<TranscriptEntry<'a>>,
}

fn sum_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values.flatten().fold(None, |total, value| Some(total.unwrap_or(0.0) + value))
}

fn compare_timestamps(left: &str, right: &str) -> Ordering {
    match (parse_timestamp(left), parse_timestamp(right)) {
        (Some(left), Some(right)) => left.cmp(&right),
        _ => left.cmp(right),
    }
}

fn build_header(kind: GroupKind, entries: &[TranscriptEntry<'_>], now: DateTime<Utc>) -> GroupHeader {
    let latest_timestamp = entries
        .iter()
        .filter_map(TranscriptEntry::timestamp)
        .max_by(|left, right| compare_timestamps(left, right))
        .map(str::to_string)
        .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true));

    GroupHeader {
        kind,
        total_cost: sum_present(entries.iter().map(TranscriptEntry::cost_usd)),
        total_duration_ms: sum_present(entries.iter().map(TranscriptEntry::duration_ms)),
        latest_timestamp,
    }
}

pub fn group_entries<'a>(entries: &[TranscriptEntry<'a>]) -> Vec<MessageGroup<'a>> {
    group_entries_at(entries, Utc::now())
}

/// Groups with `now` standing in for members that carry no timestamp.
pub fn group_entries_at<'a>(
    entries: &[TranscriptEntry<'a>],
    now: DateTime<Utc>,
) -> Vec<MessageGroup<'a>> {
    let mut groups = Vec::new();
    let mut run: Vec<TranscriptEntry<'a>> = Vec::new();

    for entry in entries {
        if entry.kind.is_user() {
            if !run.is_empty() {
                let members = std::mem::take(&mut run);
                groups.push(MessageGroup {
                    header: build_header(GroupKind::Agent, &members, now),
                    entries: members,
                });
            }
            groups.push(MessageGroup {
                header: build_header(GroupKind::User, std::slice::from_ref(entry), now),
                entries: vec![*entry],
            });
        } else {
            run.push(*entry);
        }
    }
    if !run.is_empty() {
        groups.push(MessageGroup {
            header: build_header(GroupKind::Agent, &run, now),
            entries: run,
        });
    }
    groups
}
