//! Common enrichment carried by every event.
//!
//! None of these dimensions mean anything to the simulated cluster. They are
//! drawn independently per event so that the stream carries the kind of
//! high-cardinality attributes found in real operational telemetry.

use std::{fmt, ops::RangeInclusive};

use rand::{
    Rng,
    distr::{Distribution, StandardUniform},
    seq::IndexedRandom,
};
use serde_json::Value;

use crate::{
    Fields,
    common::{choose, round1},
};

const DEVICE_TYPES: [&str; 4] = ["bare-metal", "virtual-machine", "container", "edge-appliance"];
const OPERATING_SYSTEMS: [&str; 6] = [
    "Ubuntu 22.04",
    "Ubuntu 24.04",
    "RHEL 9.3",
    "Debian 12",
    "Rocky Linux 9",
    "Windows Server 2022",
];
const BROWSER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
];
const BOT_AGENTS: [&str; 4] = [
    "Googlebot/2.1 (+http://www.google.com/bot.html)",
    "curl/8.5.0",
    "python-requests/2.31.0",
    "Prometheus/2.51.0",
];
/// Chance that an event's user agent is a bot rather than a browser.
pub const BOT_PROBABILITY: f64 = 0.05;
const PRIORITIES: [&str; 4] = ["low", "medium", "high", "urgent"];
/// Vocabulary `tags` are drawn from.
pub const TAGS: [&str; 11] = [
    "ssd",
    "nvme",
    "hdd",
    "encrypted",
    "replicated",
    "tier-1",
    "tier-2",
    "backup",
    "archive",
    "hot",
    "cold",
];
const MAX_TAGS: usize = 2;
const PHASES: [&str; 6] = [
    "provisioning",
    "active",
    "degraded",
    "rebalancing",
    "maintenance",
    "decommissioning",
];
const ORG_IDS: RangeInclusive<u16> = 1_000..=9_999;
const DEPARTMENTS: [&str; 7] = [
    "engineering",
    "finance",
    "marketing",
    "operations",
    "research",
    "sales",
    "support",
];

#[derive(Debug)]
struct IpV4 {
    octets: [u8; 4],
}

impl Distribution<IpV4> for StandardUniform {
    fn sample<R>(&self, rng: &mut R) -> IpV4
    where
        R: Rng + ?Sized,
    {
        IpV4 {
            octets: rng.random(),
        }
    }
}

impl fmt::Display for IpV4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.octets;
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UserAgent {
    Browser(&'static str),
    Bot(&'static str),
}

impl Distribution<UserAgent> for StandardUniform {
    fn sample<R>(&self, rng: &mut R) -> UserAgent
    where
        R: Rng + ?Sized,
    {
        if rng.random_bool(BOT_PROBABILITY) {
            UserAgent::Bot(choose(rng, &BOT_AGENTS))
        } else {
            UserAgent::Browser(choose(rng, &BROWSER_AGENTS))
        }
    }
}

/// Add the common enrichment fields to `fields`.
pub fn enrich<R>(fields: &mut Fields, rng: &mut R)
where
    R: Rng + ?Sized,
{
    let correlation_id = uuid::Builder::from_random_bytes(rng.random()).into_uuid();
    let (agent_kind, user_agent) = match rng.random::<UserAgent>() {
        UserAgent::Browser(agent) => ("browser", agent),
        UserAgent::Bot(agent) => ("bot", agent),
    };
    let client_ip: IpV4 = rng.random();
    let tag_count = rng.random_range(0..=MAX_TAGS);
    let tags: Vec<Value> = TAGS
        .choose_multiple(rng, tag_count)
        .map(|tag| Value::from(*tag))
        .collect();

    let mut put = |key: &str, value: Value| {
        fields.insert(key.to_string(), value);
    };
    put("correlation_id", correlation_id.to_string().into());
    put("device_type", choose(rng, &DEVICE_TYPES).into());
    put("os", choose(rng, &OPERATING_SYSTEMS).into());
    put("user_agent", user_agent.into());
    put("agent_kind", agent_kind.into());
    put("client_ip", client_ip.to_string().into());
    put("cpu_percent", round1(rng.random_range(0.0..=100.0)).into());
    put("memory_percent", round1(rng.random_range(0.0..=100.0)).into());
    put("priority", choose(rng, &PRIORITIES).into());
    put("tags", Value::Array(tags));
    put("phase", choose(rng, &PHASES).into());
    put(
        "org_id",
        format!("org-{}", rng.random_range(ORG_IDS)).into(),
    );
    put("department", choose(rng, &DEPARTMENTS).into());
}
