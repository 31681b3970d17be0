use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::location::WatchOptions;

/// (De)serialize a [Duration] as a whole number of milliseconds
pub(crate) mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, ser::Error};

    pub fn serialize<S: Serializer>(dur: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(dur.as_millis())
            .map_err(|_| S::Error::custom(format!("{dur:?} is too long to fit in milliseconds")))?;
        ser.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        u64::deserialize(de).map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Timing knobs for [crate::PatrolScreen]
pub struct ScreenConfig {
    /// How often the elapsed time gets recomputed
    #[serde(with = "millis")]
    pub tick_interval: Duration,
    /// Time between the last point being verified and the patrol ending on its own
    #[serde(with = "millis")]
    pub auto_end_delay: Duration,
    /// Options passed along when location watching starts
    pub watch: WatchOptions,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            auto_end_delay: Duration::from_millis(1500),
            watch: WatchOptions::default(),
        }
    }
}
