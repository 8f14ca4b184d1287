use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{EngineError, Result};
use super::inventory::{ReservationOwner, SeatInventory, SeatKey, StopRange};
use super::schedule::{CoachType, ScheduleStore, StationId, TrainId};

const PNR_LEN: usize = 6;
const PNR_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Refunded,
}

#[derive(Debug, Clone)]
pub struct Booking {
    pub id: Uuid,
    pub pnr: String,
    pub user_id: i64,
    pub train_id: TrainId,
    pub journey_date: NaiveDate,
    pub source_station: StationId,
    pub dest_station: StationId,
    pub range: StopRange,
    pub coach: CoachType,
    pub seats: Vec<u32>,
    pub status: BookingStatus,
    pub fare_total: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub user_id: i64,
    pub train_id: TrainId,
    pub journey_date: NaiveDate,
    pub source_station: StationId,
    pub dest_station: StationId,
    pub coach: CoachType,
    pub seats: Vec<u32>,
}

/// Rendering state of one seat for a requested stop range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatState {
    Available,
    Booked,
    Blocked,
}

/// Owns the mutable half of the engine: seat inventory, booking records and
/// the PNR registry. Route planning stays read-only in [`super::planner`].
pub struct BookingManager {
    store: Arc<ScheduleStore>,
    inventory: SeatInventory,
    bookings: Mutex<HashMap<Uuid, Booking>>,
    pnrs: Mutex<HashSet<String>>,
    fare_per_km: f64,
}

impl BookingManager {
    pub fn new(store: Arc<ScheduleStore>, fare_per_km: f64) -> Self {
        Self {
            store,
            inventory: SeatInventory::new(),
            bookings: Mutex::new(HashMap::new()),
            pnrs: Mutex::new(HashSet::new()),
            fare_per_km,
        }
    }

    /// Atomically reserves every requested seat for the derived stop range
    /// and persists a CONFIRMED booking. On any conflict nothing is mutated
    /// and the failing seats are reported.
    pub fn create_booking(&self, request: BookingRequest) -> Result<Booking> {
        let range = self.resolve_range(
            request.train_id,
            request.source_station,
            request.dest_station,
        )?;
        let seats = self.validated_seats(request.train_id, &request.seats)?;
        let distance = self.range_distance(request.train_id, range)?;

        let id = Uuid::new_v4();
        let keys = seat_keys(&request, &seats);
        self.inventory
            .reserve_batch(&keys, range, ReservationOwner::Booking(id))?;

        let fare_total =
            distance * self.fare_per_km * request.coach.fare_multiplier() * seats.len() as f64;
        let booking = Booking {
            id,
            pnr: self.fresh_pnr(),
            user_id: request.user_id,
            train_id: request.train_id,
            journey_date: request.journey_date,
            source_station: request.source_station,
            dest_station: request.dest_station,
            range,
            coach: request.coach,
            seats,
            status: BookingStatus::Confirmed,
            fare_total,
            created_at: Utc::now(),
        };

        log::info!(
            "booking {} confirmed: train {} {} coach {} seats {:?} stops [{}, {})",
            booking.pnr,
            booking.train_id,
            booking.journey_date,
            booking.coach.as_str(),
            booking.seats,
            range.from,
            range.to,
        );

        let mut bookings = self.bookings.lock().expect("bookings mutex poisoned");
        bookings.insert(id, booking.clone());
        Ok(booking)
    }

    /// Books a multi-leg itinerary as one unit: legs are booked in order and
    /// already-confirmed legs are rolled back when a later one fails.
    pub fn create_composite(&self, requests: Vec<BookingRequest>) -> Result<Vec<Booking>> {
        if requests.is_empty() {
            return Err(EngineError::InvalidRequest("no legs to book".into()));
        }

        let mut confirmed: Vec<Booking> = Vec::with_capacity(requests.len());
        for request in requests {
            match self.create_booking(request) {
                Ok(booking) => confirmed.push(booking),
                Err(e) => {
                    for booked in &confirmed {
                        if let Err(rollback) = self.cancel_booking(booked.id, false) {
                            log::error!(
                                "rollback of leg booking {} failed: {rollback}",
                                booked.pnr
                            );
                        }
                    }
                    return Err(e);
                }
            }
        }
        Ok(confirmed)
    }

    /// CONFIRMED -> CANCELLED (or REFUNDED when the caller's refund policy
    /// approved). Releases every reservation owned by the booking; any other
    /// starting state is an illegal transition.
    pub fn cancel_booking(&self, id: Uuid, refunded: bool) -> Result<Booking> {
        let mut bookings = self.bookings.lock().expect("bookings mutex poisoned");
        let booking = bookings
            .get_mut(&id)
            .ok_or_else(|| EngineError::NotFound(format!("booking {id}")))?;

        if booking.status != BookingStatus::Confirmed {
            return Err(EngineError::IllegalState(format!(
                "booking {} is not CONFIRMED",
                booking.pnr
            )));
        }

        let keys: Vec<SeatKey> = booking
            .seats
            .iter()
            .map(|&seat| SeatKey {
                train: booking.train_id,
                date: booking.journey_date,
                coach: booking.coach,
                seat,
            })
            .collect();
        self.inventory
            .release_batch(&keys, ReservationOwner::Booking(id))?;

        booking.status = if refunded {
            BookingStatus::Refunded
        } else {
            BookingStatus::Cancelled
        };
        log::info!("booking {} {:?}", booking.pnr, booking.status);
        Ok(booking.clone())
    }

    pub fn booking(&self, id: Uuid) -> Option<Booking> {
        self.bookings
            .lock()
            .expect("bookings mutex poisoned")
            .get(&id)
            .cloned()
    }

    pub fn user_bookings(&self, user_id: i64) -> Vec<Booking> {
        let bookings = self.bookings.lock().expect("bookings mutex poisoned");
        let mut out: Vec<Booking> = bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    /// Withholds seats from sale. Competes under the exact same overlap rule
    /// as passenger bookings; no privilege bypass. With no station pair the
    /// block covers the whole route.
    pub fn block_seats(
        &self,
        train_id: TrainId,
        date: NaiveDate,
        coach: CoachType,
        seats: &[u32],
        span: Option<(StationId, StationId)>,
    ) -> Result<StopRange> {
        let range = match span {
            Some((source, dest)) => self.resolve_range(train_id, source, dest)?,
            None => self.whole_route(train_id)?,
        };
        let seats = self.validated_seats(train_id, seats)?;

        let keys: Vec<SeatKey> = seats
            .iter()
            .map(|&seat| SeatKey {
                train: train_id,
                date,
                coach,
                seat,
            })
            .collect();
        self.inventory
            .reserve_batch(&keys, range, ReservationOwner::AdminBlock)?;

        log::info!(
            "admin block: train {train_id} {date} coach {} seats {seats:?} stops [{}, {})",
            coach.as_str(),
            range.from,
            range.to,
        );
        Ok(range)
    }

    /// Releases only ADMIN_BLOCK-owned reservations; passenger holds on the
    /// same seats are never touched. A seat with no live block fails the
    /// whole call.
    pub fn unblock_seats(
        &self,
        train_id: TrainId,
        date: NaiveDate,
        coach: CoachType,
        seats: &[u32],
    ) -> Result<usize> {
        let seats = self.validated_seats(train_id, seats)?;
        let keys: Vec<SeatKey> = seats
            .iter()
            .map(|&seat| SeatKey {
                train: train_id,
                date,
                coach,
                seat,
            })
            .collect();

        let released = self
            .inventory
            .release_batch(&keys, ReservationOwner::AdminBlock)?;
        log::info!(
            "admin unblock: train {train_id} {date} coach {} seats {seats:?}",
            coach.as_str()
        );
        Ok(released)
    }

    /// Per-seat state over a stop range, for the seat-layout view. An admin
    /// block outranks a passenger booking when both overlap the range.
    pub fn seat_map(
        &self,
        train_id: TrainId,
        date: NaiveDate,
        coach: CoachType,
        span: Option<(u32, u32)>,
    ) -> Result<Vec<(u32, SeatState)>> {
        let schedule = self
            .store
            .train(train_id)
            .ok_or_else(|| EngineError::NotFound(format!("train {train_id}")))?;
        let range = match span {
            Some((from, to)) => StopRange::new(from, to)?,
            None => self.whole_route(train_id)?,
        };

        let mut out = Vec::with_capacity(schedule.train.seats_per_coach as usize);
        for seat in 1..=schedule.train.seats_per_coach {
            let key = SeatKey {
                train: train_id,
                date,
                coach,
                seat,
            };
            let owners = self.inventory.overlapping_owners(key, range);
            let state = if owners.contains(&ReservationOwner::AdminBlock) {
                SeatState::Blocked
            } else if owners.is_empty() {
                SeatState::Available
            } else {
                SeatState::Booked
            };
            out.push((seat, state));
        }
        Ok(out)
    }

    /// Resolves a station pair to the half-open stop-index range for one
    /// train. Placeholder ids are rejected rather than silently accepted.
    fn resolve_range(
        &self,
        train_id: TrainId,
        source: StationId,
        dest: StationId,
    ) -> Result<StopRange> {
        if source <= 0 || dest <= 0 {
            return Err(EngineError::InvalidRequest(
                "source and destination station ids are required".into(),
            ));
        }

        let schedule = self
            .store
            .train(train_id)
            .ok_or_else(|| EngineError::NotFound(format!("train {train_id}")))?;
        let board = schedule.stop_at(source).ok_or_else(|| {
            EngineError::RouteNotFound(format!(
                "train {} does not serve station {source}",
                schedule.train.number
            ))
        })?;
        let alight = schedule.stop_at(dest).ok_or_else(|| {
            EngineError::RouteNotFound(format!(
                "train {} does not serve station {dest}",
                schedule.train.number
            ))
        })?;

        if board.stop_index >= alight.stop_index {
            return Err(EngineError::RouteNotFound(format!(
                "train {} serves stations {source} and {dest} in the wrong order",
                schedule.train.number
            )));
        }
        StopRange::new(board.stop_index, alight.stop_index)
    }

    fn whole_route(&self, train_id: TrainId) -> Result<StopRange> {
        let schedule = self
            .store
            .train(train_id)
            .ok_or_else(|| EngineError::NotFound(format!("train {train_id}")))?;
        StopRange::new(
            schedule.first_stop().stop_index,
            schedule.last_stop().stop_index,
        )
    }

    fn range_distance(&self, train_id: TrainId, range: StopRange) -> Result<f64> {
        let schedule = self
            .store
            .train(train_id)
            .ok_or_else(|| EngineError::NotFound(format!("train {train_id}")))?;
        let from = schedule
            .stops
            .iter()
            .find(|s| s.stop_index == range.from)
            .map(|s| s.distance_km);
        let to = schedule
            .stops
            .iter()
            .find(|s| s.stop_index == range.to)
            .map(|s| s.distance_km);
        match (from, to) {
            (Some(from), Some(to)) => Ok(to - from),
            _ => Err(EngineError::RouteNotFound(format!(
                "train {train_id} has no stops {} and {}",
                range.from, range.to
            ))),
        }
    }

    fn validated_seats(&self, train_id: TrainId, seats: &[u32]) -> Result<Vec<u32>> {
        if seats.is_empty() {
            return Err(EngineError::InvalidRequest("no seats selected".into()));
        }
        let schedule = self
            .store
            .train(train_id)
            .ok_or_else(|| EngineError::NotFound(format!("train {train_id}")))?;
        let max = schedule.train.seats_per_coach;

        let mut out = seats.to_vec();
        out.sort();
        out.dedup();
        for &seat in &out {
            if seat == 0 || seat > max {
                return Err(EngineError::InvalidRequest(format!(
                    "seat {seat} is outside 1..={max}"
                )));
            }
        }
        Ok(out)
    }

    /// Fixed-width alphanumeric PNR, collision-checked against every PNR ever
    /// issued. Cancelled bookings keep their entry, so a PNR is never reused.
    fn fresh_pnr(&self) -> String {
        let mut rng = rand::rng();
        let mut pnrs = self.pnrs.lock().expect("pnr mutex poisoned");
        loop {
            let pnr: String = (0..PNR_LEN)
                .map(|_| PNR_CHARS[rng.random_range(0..PNR_CHARS.len())] as char)
                .collect();
            if pnrs.insert(pnr.clone()) {
                return pnr;
            }
        }
    }
}

fn seat_keys(request: &BookingRequest, seats: &[u32]) -> Vec<SeatKey> {
    seats
        .iter()
        .map(|&seat| SeatKey {
            train: request.train_id,
            date: request.journey_date,
            coach: request.coach,
            seat,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testutil::demo_store;

    fn manager() -> BookingManager {
        BookingManager::new(Arc::new(demo_store()), 2.0)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 20).unwrap()
    }

    fn request(user_id: i64, source: StationId, dest: StationId, seats: Vec<u32>) -> BookingRequest {
        BookingRequest {
            user_id,
            train_id: 101,
            journey_date: date(),
            source_station: source,
            dest_station: dest,
            coach: CoachType::S1,
            seats,
        }
    }

    #[test]
    fn booking_confirms_and_prices_the_whole_batch() {
        let m = manager();
        let booking = m.create_booking(request(7, 1, 4, vec![12, 13])).unwrap();

        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.range, StopRange::new(1, 4).unwrap());
        assert_eq!(booking.pnr.len(), PNR_LEN);
        // 520 km * 2.0 per km * multiplier 1.0 * 2 seats.
        assert!((booking.fare_total - 2080.0).abs() < f64::EPSILON);
    }

    #[test]
    fn coach_multiplier_raises_the_fare() {
        let m = manager();
        let mut req = request(7, 1, 4, vec![12]);
        req.coach = CoachType::A1;
        let booking = m.create_booking(req).unwrap();
        assert!((booking.fare_total - 2080.0).abs() < f64::EPSILON);
    }

    #[test]
    fn conflicting_batch_leaves_no_partial_reservation() {
        let m = manager();
        // Seat 13 is taken for an overlapping range by another passenger.
        m.create_booking(request(1, 2, 4, vec![13])).unwrap();

        let err = m.create_booking(request(2, 1, 4, vec![12, 13])).unwrap_err();
        assert!(matches!(err, EngineError::SeatConflict { seats } if seats == vec![13]));

        // Seat 12 stayed free: booking it alone succeeds.
        m.create_booking(request(2, 1, 4, vec![12])).unwrap();
    }

    #[test]
    fn same_seat_sells_for_disjoint_sub_journeys() {
        let m = manager();
        // CEN -> ADI is [1,2), ADI -> NDLS is [2,4): adjacent, no overlap.
        m.create_booking(request(1, 1, 2, vec![5])).unwrap();
        m.create_booking(request(2, 2, 4, vec![5])).unwrap();

        // [1,4) now overlaps both.
        let err = m.create_booking(request(3, 1, 4, vec![5])).unwrap_err();
        assert!(matches!(err, EngineError::SeatConflict { .. }));
    }

    #[test]
    fn cancel_frees_seats_and_is_single_shot() {
        let m = manager();
        let booking = m.create_booking(request(1, 1, 4, vec![12])).unwrap();

        let cancelled = m.cancel_booking(booking.id, false).unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);

        // Identical seats and range rebook fine, under a fresh PNR.
        let again = m.create_booking(request(2, 1, 4, vec![12])).unwrap();
        assert_ne!(again.pnr, booking.pnr);

        let err = m.cancel_booking(booking.id, false).unwrap_err();
        assert!(matches!(err, EngineError::IllegalState(_)));
    }

    #[test]
    fn refund_flag_marks_the_booking_refunded() {
        let m = manager();
        let booking = m.create_booking(request(1, 1, 4, vec![12])).unwrap();
        let refunded = m.cancel_booking(booking.id, true).unwrap();
        assert_eq!(refunded.status, BookingStatus::Refunded);
    }

    #[test]
    fn cancelling_unknown_booking_is_not_found() {
        let err = manager().cancel_booking(Uuid::new_v4(), false).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn placeholder_station_ids_are_rejected() {
        let m = manager();
        let err = m.create_booking(request(1, 0, 4, vec![12])).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRequest(_)));
    }

    #[test]
    fn wrong_order_station_pair_is_route_not_found() {
        let m = manager();
        let err = m.create_booking(request(1, 4, 1, vec![12])).unwrap_err();
        assert!(matches!(err, EngineError::RouteNotFound(_)));
    }

    #[test]
    fn unserved_station_is_route_not_found() {
        let m = manager();
        // Station 6 (KOL) exists but train 101 does not call there.
        let err = m.create_booking(request(1, 1, 6, vec![12])).unwrap_err();
        assert!(matches!(err, EngineError::RouteNotFound(_)));
    }

    #[test]
    fn seat_numbers_outside_the_coach_are_rejected() {
        let m = manager();
        let err = m.create_booking(request(1, 1, 4, vec![41])).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRequest(_)));
    }

    #[test]
    fn admin_block_and_booking_are_mutually_exclusive() {
        let m = manager();
        m.block_seats(101, date(), CoachType::S1, &[10], None).unwrap();

        let err = m.create_booking(request(1, 1, 4, vec![10])).unwrap_err();
        assert!(matches!(err, EngineError::SeatConflict { .. }));

        // And in the opposite arrival order.
        m.create_booking(request(1, 1, 4, vec![11])).unwrap();
        let err = m
            .block_seats(101, date(), CoachType::S1, &[11], None)
            .unwrap_err();
        assert!(matches!(err, EngineError::SeatConflict { .. }));
    }

    #[test]
    fn whole_route_block_spans_first_to_last_stop() {
        let m = manager();
        let range = m
            .block_seats(101, date(), CoachType::S1, &[10], None)
            .unwrap();
        assert_eq!(range, StopRange::new(1, 4).unwrap());
    }

    #[test]
    fn unblock_releases_only_admin_blocks() {
        let m = manager();
        m.block_seats(101, date(), CoachType::S1, &[10], Some((1, 2)))
            .unwrap();
        // A passenger holds the adjacent range on the same seat.
        m.create_booking(request(1, 2, 4, vec![10])).unwrap();

        m.unblock_seats(101, date(), CoachType::S1, &[10]).unwrap();

        // The passenger's hold survived the unblock.
        let err = m.create_booking(request(2, 2, 4, vec![10])).unwrap_err();
        assert!(matches!(err, EngineError::SeatConflict { .. }));
        // The admin range is sellable again.
        m.create_booking(request(2, 1, 2, vec![10])).unwrap();
    }

    #[test]
    fn unblocking_a_seat_without_a_block_is_illegal() {
        let m = manager();
        let err = m
            .unblock_seats(101, date(), CoachType::S1, &[10])
            .unwrap_err();
        assert!(matches!(err, EngineError::IllegalState(_)));
    }

    #[test]
    fn seat_map_reports_blocked_over_booked() {
        let m = manager();
        m.create_booking(request(1, 1, 4, vec![1])).unwrap();
        m.block_seats(101, date(), CoachType::S1, &[2], None).unwrap();

        let map = m.seat_map(101, date(), CoachType::S1, None).unwrap();
        assert_eq!(map.len(), 40);
        assert_eq!(map[0], (1, SeatState::Booked));
        assert_eq!(map[1], (2, SeatState::Blocked));
        assert_eq!(map[2], (3, SeatState::Available));
    }

    #[test]
    fn seat_map_ignores_reservations_outside_the_range() {
        let m = manager();
        // Seat 1 held for [1,2) only.
        m.create_booking(request(1, 1, 2, vec![1])).unwrap();

        let map = m.seat_map(101, date(), CoachType::S1, Some((2, 4))).unwrap();
        assert_eq!(map[0], (1, SeatState::Available));
    }

    #[test]
    fn composite_booking_rolls_back_earlier_legs_on_conflict() {
        let m = manager();
        // Occupy seat 5 on the connector leg so the second request conflicts.
        let mut taken = request(9, 3, 4, vec![5]);
        taken.train_id = 101;
        m.create_booking(taken).unwrap();

        let leg1 = request(1, 1, 2, vec![5]);
        let leg2 = request(1, 2, 4, vec![5]);
        let err = m.create_composite(vec![leg1, leg2]).unwrap_err();
        assert!(matches!(err, EngineError::SeatConflict { .. }));

        // Leg 1's seat was rolled back.
        m.create_booking(request(2, 1, 2, vec![5])).unwrap();
    }

    #[test]
    fn concurrent_overlapping_bookings_admit_exactly_one_winner() {
        let m = manager();
        let barrier = std::sync::Barrier::new(2);

        let outcomes: Vec<Result<Booking>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|user| {
                    let m = &m;
                    let barrier = &barrier;
                    s.spawn(move || {
                        barrier.wait();
                        m.create_booking(request(user, 1, 4, vec![21]))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let wins = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(EngineError::SeatConflict { .. }))));
    }

    #[test]
    fn concurrent_disjoint_ranges_both_succeed() {
        let m = manager();
        let barrier = std::sync::Barrier::new(2);

        let outcomes: Vec<Result<Booking>> = std::thread::scope(|s| {
            let spans = [(1, 2), (2, 4)];
            spans
                .iter()
                .map(|&(source, dest)| {
                    let m = &m;
                    let barrier = &barrier;
                    s.spawn(move || {
                        barrier.wait();
                        m.create_booking(request(source, source, dest, vec![22]))
                    })
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect()
        });

        assert!(outcomes.iter().all(|r| r.is_ok()));
    }
}
