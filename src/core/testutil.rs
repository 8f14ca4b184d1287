//! Shared builders for unit tests.

use chrono::NaiveTime;

use super::schedule::{ScheduleStop, ScheduleStore, Station, StationId, Train, TrainSchedule};

pub fn station(id: StationId, code: &str) -> Station {
    Station {
        id,
        code: code.to_string(),
        name: format!("{code} Junction"),
        city: code.to_string(),
        lat: 0.0,
        lon: 0.0,
    }
}

pub fn stop(
    station: StationId,
    index: u32,
    arrival: Option<&str>,
    departure: Option<&str>,
    distance_km: f64,
) -> ScheduleStop {
    let parse = |t: &str| NaiveTime::parse_from_str(t, "%H:%M").unwrap();
    ScheduleStop {
        station,
        stop_index: index,
        arrival: arrival.map(parse),
        departure: departure.map(parse),
        distance_km,
    }
}

pub fn train_schedule(id: i64, number: &str, stops: Vec<ScheduleStop>) -> TrainSchedule {
    TrainSchedule {
        train: Train {
            id,
            number: number.to_string(),
            name: format!("Express {number}"),
            seats_per_coach: 40,
        },
        stops,
    }
}

/// Six stations, five trains: a four-stop trunk run (101), a short connector
/// out of JP (102), a direct alternative to BCT (103), an overnight run
/// (104) and an evening connector out of NDLS (105).
pub fn demo_store() -> ScheduleStore {
    let stations = vec![
        station(1, "CEN"),
        station(2, "ADI"),
        station(3, "JP"),
        station(4, "NDLS"),
        station(5, "BCT"),
        station(6, "KOL"),
    ];

    let trains = vec![
        train_schedule(
            101,
            "12301",
            vec![
                stop(1, 1, None, Some("08:00"), 0.0),
                stop(2, 2, Some("10:00"), Some("10:10"), 150.0),
                stop(3, 3, Some("14:15"), Some("14:20"), 300.0),
                stop(4, 4, Some("18:00"), None, 520.0),
            ],
        ),
        train_schedule(
            102,
            "12952",
            vec![
                stop(3, 1, None, Some("14:30"), 0.0),
                stop(5, 2, Some("20:30"), None, 400.0),
            ],
        ),
        train_schedule(
            103,
            "12009",
            vec![
                stop(1, 1, None, Some("09:00"), 0.0),
                stop(5, 2, Some("17:00"), None, 500.0),
            ],
        ),
        train_schedule(
            104,
            "12322",
            vec![
                stop(6, 1, None, Some("23:30"), 0.0),
                stop(5, 2, Some("01:30"), None, 200.0),
            ],
        ),
        train_schedule(
            105,
            "12954",
            vec![
                stop(4, 1, None, Some("19:00"), 0.0),
                stop(5, 2, Some("23:30"), None, 420.0),
            ],
        ),
    ];

    ScheduleStore::new(stations, trains).unwrap()
}
