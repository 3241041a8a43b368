// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-client token bucket rate limiting.

use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
	body::Body,
	extract::{ConnectInfo, State},
	http::Request,
	middleware::Next,
	response::{IntoResponse, Response},
};

use crate::error::ServerError;
use crate::state::AppState;

const PRUNE_THRESHOLD: usize = 4096;

/// A request budget such as `100/minute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
	requests: u32,
	per: Duration,
}

impl RateLimit {
	pub fn new(requests: u32, per: Duration) -> Self {
		Self { requests, per }
	}

	pub fn requests(&self) -> u32 {
		self.requests
	}

	pub fn per(&self) -> Duration {
		self.per
	}

	fn refill_per_sec(&self) -> f64 {
		f64::from(self.requests) / self.per.as_secs_f64()
	}

	fn unit(&self) -> &'static str {
		match self.per.as_secs() {
			1 => "second",
			60 => "minute",
			_ => "hour",
		}
	}
}

impl Default for RateLimit {
	fn default() -> Self {
		Self::new(100, Duration::from_secs(60))
	}
}

impl fmt::Display for RateLimit {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.requests, self.unit())
	}
}

impl FromStr for RateLimit {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (count, unit) = s
			.trim()
			.split_once('/')
			.ok_or_else(|| format!("expected '<count>/<unit>', got '{s}'"))?;
		let requests: u32 = count
			.trim()
			.parse()
			.map_err(|_| format!("'{}' is not a request count", count.trim()))?;
		if requests == 0 {
			return Err("request count must be at least 1".to_string());
		}
		let unit = unit.trim().to_ascii_lowercase();
		let per = match unit.strip_suffix('s').unwrap_or(&unit) {
			"second" | "sec" => Duration::from_secs(1),
			"minute" | "min" => Duration::from_secs(60),
			"hour" => Duration::from_secs(3600),
			other => return Err(format!("unknown rate limit unit '{other}'")),
		};
		Ok(Self { requests, per })
	}
}

struct TokenBucket {
	tokens: f64,
	last_refill: Instant,
}

#[derive(Clone)]
pub struct RateLimiter {
	limit: RateLimit,
	buckets: Arc<Mutex<HashMap<IpAddr, TokenBucket>>>,
}

impl RateLimiter {
	pub fn new(limit: RateLimit) -> Self {
		Self {
			limit,
			buckets: Arc::new(Mutex::new(HashMap::new())),
		}
	}

	pub fn limit(&self) -> RateLimit {
		self.limit
	}

	/// Take a token for `client`. On refusal, returns how long until the
	/// next token is available.
	pub fn check(&self, client: IpAddr) -> Result<(), Duration> {
		self.check_at(client, Instant::now())
	}

	fn check_at(&self, client: IpAddr, now: Instant) -> Result<(), Duration> {
		let mut buckets = self
			.buckets
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner());
		if buckets.len() >= PRUNE_THRESHOLD {
			let idle = self.limit.per;
			buckets.retain(|_, b| now.saturating_duration_since(b.last_refill) < idle);
		}

		let max = f64::from(self.limit.requests);
		let rate = self.limit.refill_per_sec();
		let bucket = buckets.entry(client).or_insert(TokenBucket {
			tokens: max,
			last_refill: now,
		});

		let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
		bucket.tokens = (bucket.tokens + elapsed * rate).min(max);
		bucket.last_refill = now;

		if bucket.tokens >= 1.0 {
			bucket.tokens -= 1.0;
			Ok(())
		} else {
			Err(Duration::from_secs_f64((1.0 - bucket.tokens) / rate))
		}
	}
}

/// Reject clients that exceed the configured budget, keyed by remote address.
pub async fn rate_limit(
	State(state): State<AppState>,
	request: Request<Body>,
	next: Next,
) -> Response {
	let client = request
		.extensions()
		.get::<ConnectInfo<SocketAddr>>()
		.map(|ConnectInfo(addr)| addr.ip())
		.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

	if let Err(retry_after) = state.limiter.check(client) {
		tracing::warn!(
			client = %client,
			path = %request.uri().path(),
			"rate limit exceeded"
		);
		return ServerError::RateLimited {
			limit: state.limiter.limit().to_string(),
			retry_after,
		}
		.into_response();
	}

	next.run(request).await
}
