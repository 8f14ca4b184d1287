use std::sync::Arc;

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use chrono::NaiveTime;
use uuid::Uuid;

use crate::core::booking::{BookingManager, BookingRequest, SeatState};
use crate::core::planner::{Itinerary, Leg, Planner};
use crate::core::schedule::{CoachType, ScheduleStore, StationId};

use super::types::*;

pub type Result<T> = std::result::Result<T, ErrorResponse>;

const SEATS_PER_ROW: usize = 4;

pub async fn search(
    State(store): State<Arc<ScheduleStore>>,
    State(planner): State<Arc<Planner>>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<ItinerarySummary>>> {
    let origin = station_by_code(&store, &q.from)?;
    let dest = station_by_code(&store, &q.to)?;

    let itineraries = planner.find_routes(origin, dest)?;
    let summaries = itineraries
        .into_iter()
        .map(|itinerary| summarize(&store, itinerary, q.date, origin, dest))
        .collect();

    Ok(Json(summaries))
}

pub async fn seat_layout(
    State(store): State<Arc<ScheduleStore>>,
    State(engine): State<Arc<BookingManager>>,
    Query(q): Query<SeatQuery>,
) -> Result<Json<Vec<SeatRowDto>>> {
    let coach: CoachType = q.coach.parse()?;

    let span = match (q.start_seq, q.end_seq) {
        (None, None) => None,
        (start, end) => {
            let schedule = store.train(q.train_id).ok_or_else(|| {
                ErrorResponse::new(StatusCode::NOT_FOUND, format!("train {} not found", q.train_id))
            })?;
            Some((
                start.unwrap_or(schedule.first_stop().stop_index),
                end.unwrap_or(schedule.last_stop().stop_index),
            ))
        }
    };

    let seats = engine.seat_map(q.train_id, q.date, coach, span)?;

    let rows = seats
        .chunks(SEATS_PER_ROW)
        .enumerate()
        .map(|(i, chunk)| SeatRowDto {
            row_number: i as u32 + 1,
            seats: chunk
                .iter()
                .map(|&(number, state)| SeatDto {
                    id: number,
                    number: number.to_string(),
                    status: seat_status(state).to_string(),
                })
                .collect(),
        })
        .collect();

    Ok(Json(rows))
}

pub async fn create_booking(
    State(engine): State<Arc<BookingManager>>,
    Json(r): Json<BookingRequestDto>,
) -> Result<Json<BookingDto>> {
    let booking = engine.create_booking(to_core_request(r)?)?;
    Ok(Json(booking.into()))
}

pub async fn create_composite_booking(
    State(engine): State<Arc<BookingManager>>,
    Json(r): Json<CompositeBookingRequest>,
) -> Result<Json<Vec<BookingDto>>> {
    let requests = r
        .bookings
        .into_iter()
        .map(to_core_request)
        .collect::<Result<Vec<_>>>()?;

    let bookings = engine.create_composite(requests)?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

pub async fn get_booking(
    State(engine): State<Arc<BookingManager>>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingDto>> {
    let booking = engine
        .booking(id)
        .ok_or_else(|| ErrorResponse::new(StatusCode::NOT_FOUND, format!("booking {id} not found")))?;
    Ok(Json(booking.into()))
}

pub async fn user_bookings(
    State(engine): State<Arc<BookingManager>>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<BookingDto>>> {
    let bookings = engine.user_bookings(user_id);
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

pub async fn cancel_booking(
    State(engine): State<Arc<BookingManager>>,
    Path(id): Path<Uuid>,
    Query(q): Query<CancelQuery>,
) -> Result<Json<BookingDto>> {
    let booking = engine.cancel_booking(id, q.refund.unwrap_or(false))?;
    Ok(Json(booking.into()))
}

pub async fn delete_booking(
    State(engine): State<Arc<BookingManager>>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingDto>> {
    let booking = engine.cancel_booking(id, false)?;
    Ok(Json(booking.into()))
}

pub async fn block_seats(
    State(engine): State<Arc<BookingManager>>,
    Json(r): Json<BlockSeatsRequest>,
) -> Result<Json<BlockSeatsResponse>> {
    let coach: CoachType = r.coach.parse()?;

    // A missing or placeholder (<= 0) station pair means "whole route"; a
    // half-specified pair is malformed rather than guessed at.
    let span = match (
        r.source_station_id.filter(|&id| id > 0),
        r.dest_station_id.filter(|&id| id > 0),
    ) {
        (Some(source), Some(dest)) => Some((source, dest)),
        (None, None) => None,
        _ => {
            return Err(ErrorResponse::new(
                StatusCode::BAD_REQUEST,
                "both or neither of sourceStationId and destStationId must be given",
            ))
        }
    };

    let range = engine.block_seats(r.train_id, r.journey_date, coach, &r.seats, span)?;
    Ok(Json(BlockSeatsResponse {
        blocked_seats: r.seats,
        from_seq: range.from,
        to_seq: range.to,
    }))
}

pub async fn unblock_seats(
    State(engine): State<Arc<BookingManager>>,
    Json(r): Json<UnblockSeatsRequest>,
) -> Result<Json<UnblockSeatsResponse>> {
    let coach: CoachType = r.coach_type.parse()?;
    let released = engine.unblock_seats(r.train_id, r.journey_date, coach, &r.seat_numbers)?;
    Ok(Json(UnblockSeatsResponse {
        released_seats: released,
    }))
}

fn to_core_request(r: BookingRequestDto) -> Result<BookingRequest> {
    let coach: CoachType = r.coach_type.parse()?;
    Ok(BookingRequest {
        user_id: r.user_id,
        train_id: r.train_id,
        journey_date: r.journey_date,
        source_station: r.source_station_id,
        dest_station: r.dest_station_id,
        coach,
        seats: r.selected_seats,
    })
}

fn station_by_code(store: &ScheduleStore, code: &str) -> Result<StationId> {
    store
        .station_by_code(code)
        .map(|s| s.id)
        .ok_or_else(|| ErrorResponse::new(StatusCode::NOT_FOUND, format!("unknown station {code}")))
}

fn summarize(
    store: &ScheduleStore,
    itinerary: Itinerary,
    date: chrono::NaiveDate,
    origin: StationId,
    dest: StationId,
) -> ItinerarySummary {
    let first = &itinerary.legs[0];
    let last = &itinerary.legs[itinerary.legs.len() - 1];

    let (train_name, train_number, segments) = if itinerary.is_direct() {
        (first.train_name.clone(), first.train_number.clone(), None)
    } else {
        (
            format!("{} -> {}", first.train_name, last.train_name),
            format!("{}/{}", first.train_number, last.train_number),
            Some(itinerary.legs.iter().map(|leg| segment(store, leg)).collect()),
        )
    };

    ItinerarySummary {
        train_id: first.train_id,
        train_name,
        train_number,
        journey_date: date,
        source_station_id: origin,
        dest_station_id: dest,
        source_time: hhmm(first.departure),
        dest_time: hhmm(last.arrival),
        duration: format!(
            "{}h {}m",
            itinerary.duration_min / 60,
            itinerary.duration_min % 60
        ),
        price: itinerary.fare,
        is_direct: itinerary.is_direct(),
        layover_station: itinerary
            .transfer_station
            .and_then(|id| store.station(id))
            .map(|s| s.name.clone()),
        segments,
    }
}

fn segment(store: &ScheduleStore, leg: &Leg) -> SegmentDto {
    let code = |id: StationId| {
        store
            .station(id)
            .map(|s| s.code.clone())
            .unwrap_or_default()
    };

    SegmentDto {
        train_id: leg.train_id,
        train_name: leg.train_name.clone(),
        train_number: leg.train_number.clone(),
        source_station_id: leg.from_station,
        source_station_code: code(leg.from_station),
        dest_station_id: leg.to_station,
        dest_station_code: code(leg.to_station),
        departure_time: hhmm(leg.departure),
        arrival_time: hhmm(leg.arrival),
    }
}

fn seat_status(state: SeatState) -> &'static str {
    match state {
        SeatState::Available => "available",
        SeatState::Booked => "booked",
        SeatState::Blocked => "blocked",
    }
}

fn hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}
