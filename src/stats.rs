use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::guests::repo::Guest;

pub const RECENT_LIMIT: usize = 5;

/// One row of a preference frequency table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreferenceCount {
    pub item: String,
    pub count: u64,
}

/// Summary derived from the full guest list on every dashboard request.
/// Never persisted; cheap enough at tens to low thousands of rows.
#[derive(Debug, Serialize, Deserialize)]
pub struct AggregatedStats {
    pub total_guests: i64,
    pub attending_guests: i64,
    pub not_attending_guests: i64,
    pub with_companion: i64,
    pub total_participants: i64,
    pub food_stats: Vec<PreferenceCount>,
    pub drink_stats: Vec<PreferenceCount>,
    pub recent_guests: Vec<Guest>,
}

/// Compute the dashboard summary. `guests` must already be ordered most
/// recent first, as the storage scan returns it.
pub fn aggregate(guests: &[Guest]) -> AggregatedStats {
    let total_guests = guests.len() as i64;
    let attending_guests = guests.iter().filter(|g| g.is_attending()).count() as i64;
    let not_attending_guests = total_guests - attending_guests;
    let with_companion = guests.iter().filter(|g| g.has_companion()).count() as i64;
    let attending_companions = guests
        .iter()
        .filter(|g| g.is_attending() && g.has_companion())
        .count() as i64;

    AggregatedStats {
        total_guests,
        attending_guests,
        not_attending_guests,
        with_companion,
        total_participants: attending_guests + attending_companions,
        food_stats: tally(guests.iter().filter_map(|g| g.food_preference.as_deref())),
        drink_stats: tally(guests.iter().filter_map(|g| g.drink_preference.as_deref())),
        recent_guests: guests.iter().take(RECENT_LIMIT).cloned().collect(),
    }
}

/// Per-item frequency over comma-joined preference strings. Every
/// occurrence counts, including duplicates within one record. Sorted by
/// count descending; the stable sort keeps ties in first-seen order
/// (not part of the contract).
fn tally<'a>(values: impl Iterator<Item = &'a str>) -> Vec<PreferenceCount> {
    let mut counts: Vec<PreferenceCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for value in values {
        for item in value.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            match index.get(item) {
                Some(&i) => counts[i].count += 1,
                None => {
                    index.insert(item.to_string(), counts.len());
                    counts.push(PreferenceCount {
                        item: item.to_string(),
                        count: 1,
                    });
                }
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}
