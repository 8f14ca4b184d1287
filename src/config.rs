use std::env::VarError;

use anyhow::anyhow;

pub const REQUIRED_VARIABLES: &[&str] = &["LISTEN_PORT", "SCHEDULE_PATH", "API_TOKEN", "ADMIN_TOKEN"];

const DEFAULT_TRANSFER_BUFFER_MIN: i64 = 20;
const DEFAULT_FARE_PER_KM: f64 = 2.0;

pub struct Config {
    pub listen_port: u16,
    pub schedule_path: String,
    pub api_token: String,
    pub admin_token: String,
    pub transfer_buffer_min: i64,
    pub fare_per_km: f64,
}

impl Config {
    pub fn env() -> anyhow::Result<Self> {
        let listen_port = env("LISTEN_PORT")?
            .parse()
            .map_err(|e| anyhow!("LISTEN_PORT is not a valid port: {e}"))?;
        let schedule_path = env("SCHEDULE_PATH")?;
        let api_token = env("API_TOKEN")?;
        let admin_token = env("ADMIN_TOKEN")?;
        let transfer_buffer_min = env_or("TRANSFER_BUFFER_MIN", DEFAULT_TRANSFER_BUFFER_MIN)?;
        let fare_per_km = env_or("FARE_PER_KM", DEFAULT_FARE_PER_KM)?;

        Ok(Self {
            listen_port,
            schedule_path,
            api_token,
            admin_token,
            transfer_buffer_min,
            fare_per_km,
        })
    }

    pub fn log(&self) {
        log::info!(
            "config: port {}, schedule {}, transfer buffer {} min, fare {}/km",
            self.listen_port,
            self.schedule_path,
            self.transfer_buffer_min,
            self.fare_per_km
        );
    }
}

fn env(name: &str) -> anyhow::Result<String> {
    std::env::var(name).map_err(|e| match e {
        VarError::NotPresent => anyhow!("{name} not set"),
        VarError::NotUnicode(_) => anyhow!("{name} value is not valid unicode"),
    })
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|e| anyhow!("{name} is not valid: {e}")),
        Err(VarError::NotPresent) => Ok(default),
        Err(VarError::NotUnicode(_)) => Err(anyhow!("{name} value is not valid unicode")),
    }
}
