use axum::http::StatusCode;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::booking::{Booking, BookingStatus};

#[derive(Deserialize)]
pub struct SearchQuery {
    pub from: String,
    pub to: String,
    pub date: NaiveDate,
}

#[derive(Serialize, Deserialize)]
pub struct SegmentDto {
    #[serde(rename = "trainId")]
    pub train_id: i64,

    #[serde(rename = "trainName")]
    pub train_name: String,

    #[serde(rename = "trainNumber")]
    pub train_number: String,

    #[serde(rename = "sourceStationId")]
    pub source_station_id: i64,

    #[serde(rename = "sourceStationCode")]
    pub source_station_code: String,

    #[serde(rename = "destStationId")]
    pub dest_station_id: i64,

    #[serde(rename = "destStationCode")]
    pub dest_station_code: String,

    #[serde(rename = "departureTime")]
    pub departure_time: String,

    #[serde(rename = "arrivalTime")]
    pub arrival_time: String,
}

#[derive(Serialize, Deserialize)]
pub struct ItinerarySummary {
    #[serde(rename = "trainId")]
    pub train_id: i64,

    #[serde(rename = "trainName")]
    pub train_name: String,

    #[serde(rename = "trainNumber")]
    pub train_number: String,

    #[serde(rename = "journeyDate")]
    pub journey_date: NaiveDate,

    #[serde(rename = "sourceStationId")]
    pub source_station_id: i64,

    #[serde(rename = "destStationId")]
    pub dest_station_id: i64,

    #[serde(rename = "sourceTime")]
    pub source_time: String,

    #[serde(rename = "destTime")]
    pub dest_time: String,

    pub duration: String,
    pub price: f64,

    #[serde(rename = "isDirect")]
    pub is_direct: bool,

    #[serde(rename = "layoverStation", skip_serializing_if = "Option::is_none")]
    pub layover_station: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<SegmentDto>>,
}

#[derive(Deserialize)]
pub struct SeatQuery {
    #[serde(rename = "trainId")]
    pub train_id: i64,

    pub date: NaiveDate,

    #[serde(default = "default_coach")]
    pub coach: String,

    #[serde(rename = "startSeq")]
    pub start_seq: Option<u32>,

    #[serde(rename = "endSeq")]
    pub end_seq: Option<u32>,
}

fn default_coach() -> String {
    "S1".to_string()
}

#[derive(Serialize, Deserialize)]
pub struct SeatDto {
    pub id: u32,
    pub number: String,
    pub status: String,
}

#[derive(Serialize, Deserialize)]
pub struct SeatRowDto {
    #[serde(rename = "rowNumber")]
    pub row_number: u32,

    pub seats: Vec<SeatDto>,
}

#[derive(Serialize, Deserialize)]
pub struct BookingRequestDto {
    #[serde(rename = "userId")]
    pub user_id: i64,

    #[serde(rename = "trainId")]
    pub train_id: i64,

    #[serde(rename = "journeyDate")]
    pub journey_date: NaiveDate,

    #[serde(rename = "sourceStationId")]
    pub source_station_id: i64,

    #[serde(rename = "destStationId")]
    pub dest_station_id: i64,

    #[serde(rename = "coachType")]
    pub coach_type: String,

    #[serde(rename = "selectedSeats")]
    pub selected_seats: Vec<u32>,
}

#[derive(Serialize, Deserialize)]
pub struct CompositeBookingRequest {
    pub bookings: Vec<BookingRequestDto>,
}

#[derive(Serialize, Deserialize)]
pub struct BookingDto {
    #[serde(rename = "bookingId")]
    pub booking_id: Uuid,

    pub pnr: String,

    #[serde(rename = "userId")]
    pub user_id: i64,

    #[serde(rename = "trainId")]
    pub train_id: i64,

    #[serde(rename = "journeyDate")]
    pub journey_date: NaiveDate,

    #[serde(rename = "sourceStationId")]
    pub source_station_id: i64,

    #[serde(rename = "destStationId")]
    pub dest_station_id: i64,

    #[serde(rename = "coachType")]
    pub coach_type: String,

    pub seats: Vec<u32>,
    pub status: BookingStatus,

    #[serde(rename = "totalFare")]
    pub total_fare: f64,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingDto {
    fn from(b: Booking) -> Self {
        Self {
            booking_id: b.id,
            pnr: b.pnr,
            user_id: b.user_id,
            train_id: b.train_id,
            journey_date: b.journey_date,
            source_station_id: b.source_station,
            dest_station_id: b.dest_station,
            coach_type: b.coach.as_str().to_string(),
            seats: b.seats,
            status: b.status,
            total_fare: b.fare_total,
            created_at: b.created_at,
        }
    }
}

#[derive(Deserialize)]
pub struct CancelQuery {
    pub refund: Option<bool>,
}

#[derive(Serialize, Deserialize)]
pub struct BlockSeatsRequest {
    #[serde(rename = "trainId")]
    pub train_id: i64,

    #[serde(rename = "journeyDate")]
    pub journey_date: NaiveDate,

    pub coach: String,
    pub seats: Vec<u32>,

    #[serde(rename = "sourceStationId")]
    pub source_station_id: Option<i64>,

    #[serde(rename = "destStationId")]
    pub dest_station_id: Option<i64>,
}

#[derive(Serialize, Deserialize)]
pub struct BlockSeatsResponse {
    #[serde(rename = "blockedSeats")]
    pub blocked_seats: Vec<u32>,

    #[serde(rename = "fromSeq")]
    pub from_seq: u32,

    #[serde(rename = "toSeq")]
    pub to_seq: u32,
}

#[derive(Serialize, Deserialize)]
pub struct UnblockSeatsRequest {
    #[serde(rename = "trainId")]
    pub train_id: i64,

    #[serde(rename = "journeyDate")]
    pub journey_date: NaiveDate,

    #[serde(rename = "coachType")]
    pub coach_type: String,

    #[serde(rename = "seatNumbers")]
    pub seat_numbers: Vec<u32>,
}

#[derive(Serialize, Deserialize)]
pub struct UnblockSeatsResponse {
    #[serde(rename = "releasedSeats")]
    pub released_seats: usize,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    #[serde(skip)]
    pub status: StatusCode,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seats: Option<Vec<u32>>,
}
