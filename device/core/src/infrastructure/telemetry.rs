// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Simulated telemetry source
//
// Temperature / humidity readings for exercising the session. The payload
// shape is illustrative and carries no contract.

use bytes::Bytes;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use crate::domain::session::{TelemetryMessage, TelemetrySource};

const MIN_TEMPERATURE: f64 = 20.0;
const MIN_HUMIDITY: f64 = 60.0;

pub struct SimulatedTelemetrySource {
    device_id: String,
    rng: StdRng,
}

impl SimulatedTelemetrySource {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_seed(device_id: impl Into<String>, seed: u64) -> Self {
        Self {
            device_id: device_id.into(),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl TelemetrySource for SimulatedTelemetrySource {
    fn next_message(&mut self) -> TelemetryMessage {
        let temperature = MIN_TEMPERATURE + self.rng.random::<f64>() * 15.0;
        let humidity = MIN_HUMIDITY + self.rng.random::<f64>() * 20.0;
        let created_at = Utc::now();

        let body = serde_json::json!({
            "deviceId": self.device_id,
            "temperature": temperature,
            "humidity": humidity,
            "timestamp": created_at.to_rfc3339(),
        });

        TelemetryMessage {
            message_id: Uuid::new_v4().to_string(),
            content_type: "application/json".to_string(),
            created_at,
            body: Bytes::from(body.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readings_in_range() {
        let mut source = SimulatedTelemetrySource::with_seed("sensor-1", 7);
        for _ in 0..20 {
            let message = source.next_message();
            let body: serde_json::Value = serde_json::from_slice(&message.body).unwrap();
            let temperature = body["temperature"].as_f64().unwrap();
            let humidity = body["humidity"].as_f64().unwrap();
            assert!((20.0..35.0).contains(&temperature));
            assert!((60.0..80.0).contains(&humidity));
            assert_eq!(body["deviceId"], "sensor-1");
        }
    }

    #[test]
    fn test_message_ids_are_unique() {
        let mut source = SimulatedTelemetrySource::with_seed("sensor-1", 7);
        let a = source.next_message();
        let b = source.next_message();
        assert_ne!(a.message_id, b.message_id);
        assert_eq!(a.content_type, "application/json");
    }
}
