//! Access events: logins, authentication failures and management API calls.

use std::ops::RangeInclusive;

use rand::Rng;
use serde_json::json;

use super::{Materialized, USERS};
use crate::{
    Node, Volume,
    common::{choose, round2},
};

const AUTH_METHODS: [&str; 4] = ["password", "sso", "api-key", "mtls"];
const AUTH_ERRORS: [&str; 3] = [
    "E_AUTH_BAD_CREDENTIALS",
    "E_AUTH_EXPIRED_TOKEN",
    "E_AUTH_LOCKED",
];
const ATTEMPTS: RangeInclusive<u64> = 1..=10;

const METHODS: [&str; 6] = ["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"];
const STATUS_CODES: [u16; 14] = [
    200, 201, 204, 301, 302, 400, 401, 403, 404, 405, 500, 501, 502, 503,
];
const PROTOCOLS: [&str; 3] = ["HTTP/1.0", "HTTP/1.1", "HTTP/2"];
const PATH_SEGMENTS: [&str; 8] = [
    "volumes",
    "nodes",
    "snapshots",
    "replicas",
    "clusters",
    "metrics",
    "health",
    "quotas",
];
const PATH_DEPTH: RangeInclusive<usize> = 1..=3;
const RESPONSE_TIME_SECS: RangeInclusive<f64> = 0.1..=10.0;
const REQUEST_USER_IDS: RangeInclusive<u64> = 1..=100;

pub(super) fn user_login<R>(node: &Node, _volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let user = choose(rng, &USERS);
    let method = choose(rng, &AUTH_METHODS);
    Materialized::new(format!(
        "User {user} logged in to cluster {} via {method}",
        node.cluster
    ))
    .with("user", user)
    .with("auth_method", method)
}

pub(super) fn auth_failure<R>(node: &Node, _volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let user = choose(rng, &USERS);
    let attempts = rng.random_range(ATTEMPTS);
    let error_code = choose(rng, &AUTH_ERRORS);
    Materialized::new(format!(
        "Authentication FAILED for user {user} on node {} after {attempts} attempts: {error_code}",
        node.id
    ))
    .with("user", user)
    .with("attempts", attempts)
    .with("error_code", error_code)
}

fn api_path<R>(rng: &mut R) -> String
where
    R: Rng + ?Sized,
{
    let depth = rng.random_range(PATH_DEPTH);
    let mut path = String::from("/api/v1");
    for _ in 0..depth {
        path.push('/');
        path.push_str(choose(rng, &PATH_SEGMENTS));
    }
    path
}

pub(super) fn api_request<R>(node: &Node, _volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let method = choose(rng, &METHODS);
    let path = api_path(rng);
    let protocol = choose(rng, &PROTOCOLS);
    let status = choose(rng, &STATUS_CODES);
    let response_time = round2(rng.random_range(RESPONSE_TIME_SECS));
    let user_id = rng.random_range(REQUEST_USER_IDS);
    let referrer = format!("https://console.{}.example.com{}", node.region, api_path(rng));
    Materialized::new(format!(
        "{method} {path} {protocol} {status} {response_time}s on node {}",
        node.id
    ))
    .with(
        "request",
        json!({
            "method": method,
            "path": path,
            "protocol": protocol,
        }),
    )
    .with("status", status)
    .with(
        "additional_info",
        json!({
            "user_id": user_id,
            "referrer": referrer,
            "response_time": response_time,
        }),
    )
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::SmallRng};

    use super::{METHODS, STATUS_CODES, api_request, auth_failure};
    use crate::materialize::test::fixture;

    proptest! {
        #[test]
        fn api_request_has_nested_request(seed: u64) {
            let (node, volume) = fixture();
            let mut rng = SmallRng::seed_from_u64(seed);
            let out = api_request(&node, &volume, &mut rng);

            let request = out.fields["request"].as_object().expect("request is a map");
            let method = request["method"].as_str().expect("method is a string");
            prop_assert!(METHODS.contains(&method));
            let path = request["path"].as_str().expect("path is a string");
            prop_assert!(path.starts_with("/api/v1/"));
            let status = out.fields["status"].as_u64().expect("status is integral");
            prop_assert!(STATUS_CODES.iter().any(|s| u64::from(*s) == status));
            let info = out.fields["additional_info"].as_object().expect("additional_info is a map");
            let rt = info["response_time"].as_f64().expect("response time is numeric");
            prop_assert!((0.1..=10.0).contains(&rt));
        }

        #[test]
        fn auth_failure_names_a_user(seed: u64) {
            let (node, volume) = fixture();
            let mut rng = SmallRng::seed_from_u64(seed);
            let out = auth_failure(&node, &volume, &mut rng);
            let user = out.fields["user"].as_str().expect("user is a string");
            prop_assert!(out.message.contains(user));
        }
    }
}
