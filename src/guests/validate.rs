use crate::error::AppError;
use crate::guests::dto::SaveGuestRequest;
use crate::guests::repo::{Attendance, NewGuest};

pub const MAX_WISHES_CHARS: usize = 1000;

/// Turn an untrusted payload into a normalized record ready for storage.
/// Pure function; checks run in order and the first failure wins.
pub fn normalize(payload: SaveGuestRequest) -> Result<NewGuest, AppError> {
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| n.chars().count() >= 2)
        .ok_or(AppError::InvalidName)?
        .to_string();

    let attendance = payload
        .attendance
        .as_deref()
        .and_then(Attendance::parse)
        .ok_or(AppError::InvalidAttendance)?;

    let companion_name = payload
        .companion
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    let food_preference = merge_preferences(&payload.guest_food, &payload.companion_food);
    let drink_preference = merge_preferences(&payload.guest_drink, &payload.companion_drink);

    let wishes = payload
        .wishes
        .as_deref()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(|w| w.chars().take(MAX_WISHES_CHARS).collect());

    Ok(NewGuest {
        name,
        attendance,
        companion_name,
        food_preference,
        drink_preference,
        wishes,
    })
}

/// Canonical preference string: guest items first, companion items after,
/// both in their submitted order, joined with ", ". Duplicates are kept so
/// the tally later counts each selection.
fn merge_preferences(guest: &[String], companion: &[String]) -> Option<String> {
    let merged: Vec<&str> = guest
        .iter()
        .chain(companion.iter())
        .map(|s| s.as_str())
        .collect();
    if merged.is_empty() {
        None
    } else {
        Some(merged.join(", "))
    }
}
