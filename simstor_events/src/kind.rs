//! The closed set of event kinds the materializer knows how to build.

use std::fmt;

use crate::Severity;

macro_rules! event_kinds {
    ($($variant:ident => ($name:literal, $severity:ident, $weight:literal)),+ $(,)?) => {
        /// A named category of simulated cluster occurrence.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum EventKind {
            $(
                #[doc = concat!("`", $name, "`")]
                $variant,
            )+
        }

        impl EventKind {
            /// Every kind, in catalog order.
            pub const ALL: &'static [EventKind] = &[$(EventKind::$variant),+];

            /// The wire name of this kind, as it appears in `fields.event`.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(EventKind::$variant => $name,)+
                }
            }

            /// Severity assigned to this kind in the built-in catalog.
            #[must_use]
            pub const fn default_severity(self) -> Severity {
                match self {
                    $(EventKind::$variant => Severity::$severity,)+
                }
            }

            /// Relative frequency of this kind in the built-in catalog.
            #[must_use]
            pub const fn default_weight(self) -> f64 {
                match self {
                    $(EventKind::$variant => $weight,)+
                }
            }

            /// Look a kind up by its wire name.
            #[must_use]
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(EventKind::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

event_kinds! {
    NodeJoined => ("NODE_JOINED", Info, 3.0),
    NodeLeft => ("NODE_LEFT", Warning, 1.0),
    NodeOffline => ("NODE_OFFLINE", Error, 0.5),
    NodeRebooted => ("NODE_REBOOTED", Warning, 0.8),
    VolumeCreated => ("VOLUME_CREATED", Info, 4.0),
    VolumeDeleted => ("VOLUME_DELETED", Info, 1.5),
    VolumeExpanded => ("VOLUME_EXPANDED", Info, 2.0),
    VolumeMounted => ("VOLUME_MOUNTED", Debug, 3.0),
    SnapshotCreated => ("SNAPSHOT_CREATED", Info, 3.0),
    DataRead => ("DATA_READ", Debug, 20.0),
    DataWrite => ("DATA_WRITE", Debug, 18.0),
    ReplicationStarted => ("REPLICATION_STARTED", Info, 4.0),
    ReplicationCompleted => ("REPLICATION_COMPLETED", Info, 4.0),
    ReplicationFailed => ("REPLICATION_FAILED", Error, 1.0),
    AlertCapacity => ("ALERT_CAPACITY", Warning, 2.0),
    AlertPerformance => ("ALERT_PERFORMANCE", Warning, 2.0),
    CacheHit => ("CACHE_HIT", Debug, 10.0),
    CacheMiss => ("CACHE_MISS", Debug, 6.0),
    IoLatencySpike => ("IO_LATENCY_SPIKE", Warning, 2.0),
    DiskFailure => ("DISK_FAILURE", Critical, 0.3),
    DiskTemperatureHigh => ("DISK_TEMPERATURE_HIGH", Warning, 1.0),
    DataCorruptionDetected => ("DATA_CORRUPTION_DETECTED", Critical, 0.2),
    UserLogin => ("USER_LOGIN", Info, 3.0),
    AuthFailure => ("AUTH_FAILURE", Error, 1.0),
    ApiRequest => ("API_REQUEST", Info, 6.0),
    HealthCheck => ("HEALTH_CHECK", Debug, 8.0),
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
