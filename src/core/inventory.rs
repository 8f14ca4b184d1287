use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use uuid::Uuid;

use super::error::{EngineError, Result};
use super::schedule::{CoachType, TrainId};

/// Unit of contention: one physical seat on one run. All inventory mutations
/// serialize per key, nothing wider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeatKey {
    pub train: TrainId,
    pub date: NaiveDate,
    pub coach: CoachType,
    pub seat: u32,
}

/// Half-open stop-index range `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopRange {
    pub from: u32,
    pub to: u32,
}

impl StopRange {
    pub fn new(from: u32, to: u32) -> Result<Self> {
        if from >= to {
            return Err(EngineError::InvalidRequest(format!(
                "boarding stop {from} must precede alighting stop {to}"
            )));
        }
        Ok(Self { from, to })
    }

    pub fn overlaps(&self, other: &StopRange) -> bool {
        self.from < other.to && other.from < self.to
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationOwner {
    Booking(Uuid),
    AdminBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationStatus {
    Live,
    Released,
}

/// A live claim on a seat for a stop range. Released reservations stay in the
/// record for audit history but no longer affect availability.
#[derive(Debug, Clone)]
pub struct SeatReservation {
    pub owner: ReservationOwner,
    pub range: StopRange,
    pub status: ReservationStatus,
}

#[derive(Debug, Default)]
struct SeatRecord {
    reservations: Vec<SeatReservation>,
}

impl SeatRecord {
    fn conflicts_with(&self, range: &StopRange) -> bool {
        self.reservations
            .iter()
            .any(|r| r.status == ReservationStatus::Live && r.range.overlaps(range))
    }

    fn live_count(&self, owner: ReservationOwner) -> usize {
        self.reservations
            .iter()
            .filter(|r| r.status == ReservationStatus::Live && r.owner == owner)
            .count()
    }
}

/// Keyed interval store over seat reservations. The outer map lock only
/// mediates handle lookup; each seat carries its own mutex, so bookings on
/// disjoint seats (or provably disjoint ranges) proceed concurrently while
/// overlapping attempts on one seat serialize.
#[derive(Debug, Default)]
pub struct SeatInventory {
    seats: Mutex<HashMap<SeatKey, Arc<Mutex<SeatRecord>>>>,
}

impl SeatInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_available(&self, key: SeatKey, range: StopRange) -> bool {
        let record = self.handle(key);
        let guard = record.lock().expect("seat mutex poisoned");
        !guard.conflicts_with(&range)
    }

    /// Live owners whose ranges overlap the queried one. Used to render seat
    /// layouts (booked vs admin-blocked).
    pub fn overlapping_owners(&self, key: SeatKey, range: StopRange) -> Vec<ReservationOwner> {
        let record = self.handle(key);
        let guard = record.lock().expect("seat mutex poisoned");
        guard
            .reservations
            .iter()
            .filter(|r| r.status == ReservationStatus::Live && r.range.overlaps(&range))
            .map(|r| r.owner)
            .collect()
    }

    /// All-or-nothing batch reserve. Locks every seat in ascending order,
    /// validates the whole batch, then commits; any conflict aborts with the
    /// complete failing-seat list and no mutation.
    pub fn reserve_batch(
        &self,
        keys: &[SeatKey],
        range: StopRange,
        owner: ReservationOwner,
    ) -> Result<()> {
        let (sorted, handles) = self.lock_order(keys);
        let mut guards = lock_all(&handles);

        let conflicts: Vec<u32> = sorted
            .iter()
            .zip(guards.iter())
            .filter(|(_, record)| record.conflicts_with(&range))
            .map(|(key, _)| key.seat)
            .collect();

        if !conflicts.is_empty() {
            return Err(EngineError::SeatConflict { seats: conflicts });
        }

        for record in guards.iter_mut() {
            record.reservations.push(SeatReservation {
                owner,
                range,
                status: ReservationStatus::Live,
            });
        }

        Ok(())
    }

    /// Releases every live reservation held by `owner` on the given keys.
    /// All-or-nothing: a key with nothing to release fails the whole batch
    /// before anything is mutated.
    pub fn release_batch(&self, keys: &[SeatKey], owner: ReservationOwner) -> Result<usize> {
        let (sorted, handles) = self.lock_order(keys);
        let mut guards = lock_all(&handles);

        let dead: Vec<u32> = sorted
            .iter()
            .zip(guards.iter())
            .filter(|(_, record)| record.live_count(owner) == 0)
            .map(|(key, _)| key.seat)
            .collect();

        if !dead.is_empty() {
            return Err(EngineError::IllegalState(format!(
                "seat(s) {dead:?} hold no live reservation for the requested owner"
            )));
        }

        let mut released = 0;
        for record in guards.iter_mut() {
            for reservation in record
                .reservations
                .iter_mut()
                .filter(|r| r.status == ReservationStatus::Live && r.owner == owner)
            {
                reservation.status = ReservationStatus::Released;
                released += 1;
            }
        }

        Ok(released)
    }

    fn handle(&self, key: SeatKey) -> Arc<Mutex<SeatRecord>> {
        let mut map = self.seats.lock().expect("inventory mutex poisoned");
        Arc::clone(map.entry(key).or_default())
    }

    /// Deterministic lock order: keys sorted and deduplicated, handles
    /// fetched under a single pass of the map lock.
    fn lock_order(&self, keys: &[SeatKey]) -> (Vec<SeatKey>, Vec<Arc<Mutex<SeatRecord>>>) {
        let mut sorted = keys.to_vec();
        sorted.sort();
        sorted.dedup();

        let mut map = self.seats.lock().expect("inventory mutex poisoned");
        let handles = sorted
            .iter()
            .map(|key| Arc::clone(map.entry(*key).or_default()))
            .collect();
        (sorted, handles)
    }
}

fn lock_all<'a>(handles: &'a [Arc<Mutex<SeatRecord>>]) -> Vec<MutexGuard<'a, SeatRecord>> {
    handles
        .iter()
        .map(|h| h.lock().expect("seat mutex poisoned"))
        .collect()
}
