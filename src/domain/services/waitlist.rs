//! Seat and waitlist decisions.
//!
//! The repositories run these inside their transactions, so the same rules
//! apply to every storage backend. All functions are pure: they look at the
//! rows already loaded and describe the writes to perform.

use crate::domain::models::registration::{new_qr_code, Registration, RegistrationStatus};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    pub registration_id: String,
    pub qr_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitlistPlan {
    /// Waitlisted registrations that move into a seat, in queue order.
    pub promotions: Vec<Promotion>,
    /// `(registration_id, new_position)` for rows whose position changes.
    pub renumbered: Vec<(String, i32)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationPlan {
    pub waitlist: WaitlistPlan,
    /// Amount to add to the event's `available_seats`.
    pub seat_delta: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityPlan {
    pub waitlist: WaitlistPlan,
    pub available_seats: i32,
}

/// Position for a newcomer joining the back of the queue.
pub fn next_waitlist_position(last_position: Option<i32>) -> i32 {
    last_position.unwrap_or(0) + 1
}

/// Works out what happens to the queue when `cancelled` leaves the event.
///
/// A freed seat goes to the head of the waitlist; if nobody waits the seat
/// returns to the pool. Remaining waitlisted rows are renumbered `1..=n`.
pub fn plan_cancellation(cancelled: &Registration, waitlist: &[Registration]) -> Result<CancellationPlan, AppError> {
    let free_seats = match cancelled.status {
        RegistrationStatus::Attended => {
            return Err(AppError::Conflict("Attendance has already been recorded for this registration".into()));
        }
        RegistrationStatus::Registered => 1,
        RegistrationStatus::Waitlisted => 0,
    };

    let queue: Vec<&Registration> = ordered_queue(waitlist)
        .into_iter()
        .filter(|r| r.id != cancelled.id)
        .collect();

    let plan = promote_and_renumber(free_seats, &queue);
    let seat_delta = free_seats as i32 - plan.promotions.len() as i32;

    Ok(CancellationPlan { waitlist: plan, seat_delta })
}

/// Works out the queue after an organizer changes the event capacity.
pub fn plan_capacity_change(new_capacity: i32, seated: i64, waitlist: &[Registration]) -> Result<CapacityPlan, AppError> {
    if new_capacity < 1 {
        return Err(AppError::Validation("Capacity must be at least 1".into()));
    }
    if (new_capacity as i64) < seated {
        return Err(AppError::Validation(format!(
            "Capacity cannot be lower than the {} seats already taken",
            seated
        )));
    }

    let free_seats = (new_capacity as i64 - seated) as usize;
    let queue = ordered_queue(waitlist);
    let plan = promote_and_renumber(free_seats, &queue);
    let available_seats = (free_seats - plan.promotions.len()) as i32;

    Ok(CapacityPlan { waitlist: plan, available_seats })
}

fn ordered_queue(waitlist: &[Registration]) -> Vec<&Registration> {
    let mut queue: Vec<&Registration> = waitlist
        .iter()
        .filter(|r| r.status == RegistrationStatus::Waitlisted)
        .collect();
    queue.sort_by(|a, b| {
        a.waitlist_position
            .unwrap_or(i32::MAX)
            .cmp(&b.waitlist_position.unwrap_or(i32::MAX))
            .then(a.created_at.cmp(&b.created_at))
    });
    queue
}

fn promote_and_renumber(free_seats: usize, queue: &[&Registration]) -> WaitlistPlan {
    let promote_count = free_seats.min(queue.len());

    let promotions = queue[..promote_count]
        .iter()
        .map(|r| Promotion {
            registration_id: r.id.clone(),
            qr_code: new_qr_code(),
        })
        .collect();

    let renumbered = queue[promote_count..]
        .iter()
        .enumerate()
        .filter_map(|(idx, r)| {
            let position = idx as i32 + 1;
            (r.waitlist_position != Some(position)).then(|| (r.id.clone(), position))
        })
        .collect();

    WaitlistPlan { promotions, renumbered }
}
