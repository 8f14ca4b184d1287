use std::sync::Arc;

use chrono::NaiveTime;

use super::error::{EngineError, Result};
use super::schedule::{ScheduleStore, StationId, TrainId, TrainSchedule};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// One train's contribution to an itinerary, from a boarding to an alighting
/// stop index.
#[derive(Debug, Clone)]
pub struct Leg {
    pub train_id: TrainId,
    pub train_number: String,
    pub train_name: String,
    pub from_station: StationId,
    pub to_station: StationId,
    pub board_index: u32,
    pub alight_index: u32,
    pub departure: NaiveTime,
    pub arrival: NaiveTime,
    pub duration_min: i64,
    pub distance_km: f64,
}

#[derive(Debug, Clone)]
pub struct Itinerary {
    pub legs: Vec<Leg>,
    pub transfer_station: Option<StationId>,
    pub duration_min: i64,
    /// Base fare (coach multiplier 1.0). Coach-specific fares are derived at
    /// booking time.
    pub fare: f64,
}

impl Itinerary {
    pub fn is_direct(&self) -> bool {
        self.legs.len() == 1
    }
}

/// Read-side route search over the immutable schedule store: direct
/// itineraries plus single-transfer connections. Itineraries with more than
/// one transfer are never produced.
pub struct Planner {
    store: Arc<ScheduleStore>,
    transfer_buffer_min: i64,
    fare_per_km: f64,
}

impl Planner {
    pub fn new(store: Arc<ScheduleStore>, transfer_buffer_min: i64, fare_per_km: f64) -> Self {
        Self {
            store,
            transfer_buffer_min,
            fare_per_km,
        }
    }

    /// Ranked itineraries between two stations: direct before connecting,
    /// then ascending duration, ties broken by fare.
    pub fn find_routes(&self, origin: StationId, dest: StationId) -> Result<Vec<Itinerary>> {
        if self.store.station(origin).is_none() {
            return Err(EngineError::NotFound(format!("station {origin}")));
        }
        if self.store.station(dest).is_none() {
            return Err(EngineError::NotFound(format!("station {dest}")));
        }
        if origin == dest {
            return Err(EngineError::InvalidRequest(
                "origin and destination are the same station".into(),
            ));
        }

        let mut itineraries = Vec::new();

        for schedule in self.store.trains() {
            if let Some(leg) = self.leg(schedule, origin, dest) {
                itineraries.push(self.direct(leg));
            }
        }

        self.collect_connections(origin, dest, &mut itineraries);

        itineraries.sort_by(|a, b| {
            a.legs
                .len()
                .cmp(&b.legs.len())
                .then(a.duration_min.cmp(&b.duration_min))
                .then(a.fare.total_cmp(&b.fare))
        });

        if itineraries.is_empty() {
            return Err(EngineError::RouteNotFound(format!(
                "no itinerary between stations {origin} and {dest}"
            )));
        }

        Ok(itineraries)
    }

    /// Every pair of distinct trains sharing an intermediate station, where
    /// the second departs no earlier than the first's arrival plus the
    /// transfer buffer. Overnight transfers are not considered: a departure
    /// before the arrival reads as a missed connection.
    fn collect_connections(&self, origin: StationId, dest: StationId, out: &mut Vec<Itinerary>) {
        for first in self.store.trains() {
            let Some(board) = first.stop_at(origin) else {
                continue;
            };

            for via in first
                .stops
                .iter()
                .filter(|s| s.stop_index > board.stop_index && s.station != dest)
            {
                let Some(leg1) = self.leg(first, origin, via.station) else {
                    continue;
                };

                for second in self.store.trains() {
                    if second.train.id == first.train.id {
                        continue;
                    }
                    let Some(leg2) = self.leg(second, via.station, dest) else {
                        continue;
                    };

                    let wait_min = (leg2.departure - leg1.arrival).num_minutes();
                    if wait_min < self.transfer_buffer_min {
                        continue;
                    }

                    let fare = (leg1.distance_km + leg2.distance_km) * self.fare_per_km;
                    out.push(Itinerary {
                        duration_min: leg1.duration_min + wait_min + leg2.duration_min,
                        transfer_station: Some(via.station),
                        fare,
                        legs: vec![leg1.clone(), leg2],
                    });
                }
            }
        }
    }

    fn direct(&self, leg: Leg) -> Itinerary {
        Itinerary {
            duration_min: leg.duration_min,
            transfer_station: None,
            fare: leg.distance_km * self.fare_per_km,
            legs: vec![leg],
        }
    }

    /// A leg exists only when the train serves both stations in increasing
    /// stop order. Times are guaranteed present by schedule validation; a
    /// missing one just disqualifies the train.
    fn leg(&self, schedule: &TrainSchedule, from: StationId, to: StationId) -> Option<Leg> {
        let board = schedule.stop_at(from)?;
        let alight = schedule.stop_at(to)?;
        if board.stop_index >= alight.stop_index {
            return None;
        }

        let departure = board.departure?;
        let arrival = alight.arrival?;

        // Arrival earlier than departure means the run crosses midnight.
        let mut duration_min = (arrival - departure).num_minutes();
        if duration_min < 0 {
            duration_min += MINUTES_PER_DAY;
        }

        Some(Leg {
            train_id: schedule.train.id,
            train_number: schedule.train.number.clone(),
            train_name: schedule.train.name.clone(),
            from_station: from,
            to_station: to,
            board_index: board.stop_index,
            alight_index: alight.stop_index,
            departure,
            arrival,
            duration_min,
            distance_km: alight.distance_km - board.distance_km,
        })
    }
}
