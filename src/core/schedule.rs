use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::error::{EngineError, Result};

pub type StationId = i64;
pub type TrainId = i64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub code: String,
    pub name: String,
    pub city: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Train {
    pub id: TrainId,
    pub number: String,
    pub name: String,
    pub seats_per_coach: u32,
}

/// Seating class with its own independent seat numbering and inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CoachType {
    S1,
    S2,
    B1,
    A1,
}

impl CoachType {
    pub fn fare_multiplier(self) -> f64 {
        match self {
            CoachType::S1 | CoachType::S2 => 1.0,
            CoachType::B1 => 1.5,
            CoachType::A1 => 2.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CoachType::S1 => "S1",
            CoachType::S2 => "S2",
            CoachType::B1 => "B1",
            CoachType::A1 => "A1",
        }
    }
}

impl FromStr for CoachType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "S1" => Ok(CoachType::S1),
            "S2" => Ok(CoachType::S2),
            "B1" => Ok(CoachType::B1),
            "A1" => Ok(CoachType::A1),
            other => Err(EngineError::InvalidRequest(format!(
                "unknown coach type: {other}"
            ))),
        }
    }
}

/// One stop of a train's run. `stop_index` is 1-based and strictly increasing
/// along the route. The origin has no arrival, the terminus no departure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleStop {
    pub station: StationId,
    pub stop_index: u32,
    pub arrival: Option<NaiveTime>,
    pub departure: Option<NaiveTime>,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainSchedule {
    pub train: Train,
    pub stops: Vec<ScheduleStop>,
}

impl TrainSchedule {
    pub fn stop_at(&self, station: StationId) -> Option<&ScheduleStop> {
        self.stops.iter().find(|s| s.station == station)
    }

    pub fn first_stop(&self) -> &ScheduleStop {
        &self.stops[0]
    }

    pub fn last_stop(&self) -> &ScheduleStop {
        &self.stops[self.stops.len() - 1]
    }
}

#[derive(Debug, Deserialize)]
struct ScheduleFile {
    stations: Vec<Station>,
    trains: Vec<TrainSchedule>,
}

/// Read-mostly reference data: every train's ordered stop sequence plus the
/// station registry. Immutable after a successful load, so the planner reads
/// it without locking.
#[derive(Debug)]
pub struct ScheduleStore {
    stations: HashMap<StationId, Station>,
    codes: HashMap<String, StationId>,
    trains: HashMap<TrainId, TrainSchedule>,
    train_order: Vec<TrainId>,
}

impl ScheduleStore {
    pub fn new(stations: Vec<Station>, trains: Vec<TrainSchedule>) -> Result<Self> {
        let mut station_map = HashMap::new();
        let mut codes = HashMap::new();

        for station in stations {
            let code = station.code.to_ascii_uppercase();
            if codes.insert(code, station.id).is_some() {
                return Err(EngineError::ScheduleIntegrity(format!(
                    "duplicate station code {}",
                    station.code
                )));
            }
            if station_map.insert(station.id, station).is_some() {
                return Err(EngineError::ScheduleIntegrity(
                    "duplicate station id".into(),
                ));
            }
        }

        let mut train_map = HashMap::new();
        let mut train_order = Vec::new();

        for schedule in trains {
            validate_stops(&schedule, &station_map)?;
            train_order.push(schedule.train.id);
            if train_map.insert(schedule.train.id, schedule).is_some() {
                return Err(EngineError::ScheduleIntegrity("duplicate train id".into()));
            }
        }

        Ok(Self {
            stations: station_map,
            codes,
            trains: train_map,
            train_order,
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: ScheduleFile = serde_json::from_str(json)
            .map_err(|e| EngineError::ScheduleIntegrity(format!("malformed schedule: {e}")))?;
        Self::new(file.stations, file.trains)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::from_json(&json)?)
    }

    pub fn station(&self, id: StationId) -> Option<&Station> {
        self.stations.get(&id)
    }

    pub fn station_by_code(&self, code: &str) -> Option<&Station> {
        self.codes
            .get(&code.to_ascii_uppercase())
            .and_then(|id| self.stations.get(id))
    }

    pub fn train(&self, id: TrainId) -> Option<&TrainSchedule> {
        self.trains.get(&id)
    }

    /// Trains in input order, so search results are deterministic.
    pub fn trains(&self) -> impl Iterator<Item = &TrainSchedule> {
        self.train_order.iter().filter_map(|id| self.trains.get(id))
    }
}

fn validate_stops(schedule: &TrainSchedule, stations: &HashMap<StationId, Station>) -> Result<()> {
    let train = &schedule.train;
    let stops = &schedule.stops;

    if stops.len() < 2 {
        return Err(EngineError::ScheduleIntegrity(format!(
            "train {} has fewer than two stops",
            train.number
        )));
    }
    if train.seats_per_coach == 0 {
        return Err(EngineError::ScheduleIntegrity(format!(
            "train {} has no seats",
            train.number
        )));
    }

    let mut seen = std::collections::HashSet::new();
    let last = stops.len() - 1;

    for (i, stop) in stops.iter().enumerate() {
        if !stations.contains_key(&stop.station) {
            return Err(EngineError::ScheduleIntegrity(format!(
                "train {} references unknown station {}",
                train.number, stop.station
            )));
        }
        if !seen.insert(stop.station) {
            return Err(EngineError::ScheduleIntegrity(format!(
                "train {} stops twice at station {}",
                train.number, stop.station
            )));
        }

        let expected_first = i == 0 && stop.stop_index != 1;
        let not_increasing = i > 0 && stop.stop_index <= stops[i - 1].stop_index;
        if expected_first || not_increasing {
            return Err(EngineError::ScheduleIntegrity(format!(
                "train {} has a non-increasing stop sequence",
                train.number
            )));
        }
        if i > 0 && stop.distance_km < stops[i - 1].distance_km {
            return Err(EngineError::ScheduleIntegrity(format!(
                "train {} has decreasing cumulative distance",
                train.number
            )));
        }

        // Origin needs a departure, the terminus an arrival, everything in
        // between both. A missing time would otherwise surface as a skipped
        // leg deep inside the planner.
        if i < last && stop.departure.is_none() {
            return Err(EngineError::ScheduleIntegrity(format!(
                "train {} stop {} has no departure time",
                train.number, stop.stop_index
            )));
        }
        if i > 0 && stop.arrival.is_none() {
            return Err(EngineError::ScheduleIntegrity(format!(
                "train {} stop {} has no arrival time",
                train.number, stop.stop_index
            )));
        }
    }

    Ok(())
}
