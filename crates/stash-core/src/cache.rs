// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded TTL cache of entry snapshots keyed by physical title.
//!
//! An entry is served only while it is younger than the TTL. When the cache
//! is full the least recently used entry is evicted.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use stash_vault::Entry;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
	pub ttl: Duration,
	pub capacity: usize,
}

impl Default for CacheSettings {
	fn default() -> Self {
		Self {
			ttl: DEFAULT_CACHE_TTL,
			capacity: DEFAULT_CACHE_CAPACITY,
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
	pub hits: u64,
	pub misses: u64,
	pub evictions: u64,
}

#[derive(Debug)]
struct Slot {
	entry: Entry,
	inserted_at: Instant,
	last_used: u64,
}

#[derive(Debug)]
pub struct EntryCache {
	settings: CacheSettings,
	slots: HashMap<String, Slot>,
	tick: u64,
	stats: CacheStats,
}

impl EntryCache {
	pub fn new(settings: CacheSettings) -> Self {
		Self {
			settings,
			slots: HashMap::with_capacity(settings.capacity.min(1024)),
			tick: 0,
			stats: CacheStats::default(),
		}
	}

	pub fn get(&mut self, title: &str) -> Option<Entry> {
		self.get_at(title, Instant::now())
	}

	pub fn insert(&mut self, title: &str, entry: Entry) {
		self.insert_at(title, entry, Instant::now());
	}

	pub fn invalidate(&mut self, title: &str) {
		self.slots.remove(title);
	}

	pub fn clear(&mut self) {
		self.slots.clear();
	}

	pub fn len(&self) -> usize {
		self.slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	pub fn stats(&self) -> CacheStats {
		self.stats
	}

	fn get_at(&mut self, title: &str, now: Instant) -> Option<Entry> {
		let ttl = self.settings.ttl;
		let expired = match self.slots.get(title) {
			None => {
				self.stats.misses += 1;
				return None;
			}
			Some(slot) => now.saturating_duration_since(slot.inserted_at) >= ttl,
		};
		if expired {
			self.slots.remove(title);
			self.stats.misses += 1;
			return None;
		}

		self.tick += 1;
		let tick = self.tick;
		let slot = self.slots.get_mut(title)?;
		slot.last_used = tick;
		self.stats.hits += 1;
		Some(slot.entry.clone())
	}

	fn insert_at(&mut self, title: &str, entry: Entry, now: Instant) {
		if self.settings.capacity == 0 {
			return;
		}
		if !self.slots.contains_key(title) && self.slots.len() >= self.settings.capacity {
			self.evict_one(now);
		}
		self.tick += 1;
		self.slots.insert(
			title.to_string(),
			Slot {
				entry,
				inserted_at: now,
				last_used: self.tick,
			},
		);
	}

	/// Drop expired slots; if none were expired, drop the least recently used.
	fn evict_one(&mut self, now: Instant) {
		let ttl = self.settings.ttl;
		let before = self.slots.len();
		self.slots
			.retain(|_, slot| now.saturating_duration_since(slot.inserted_at) < ttl);
		if self.slots.len() < before {
			self.stats.evictions += (before - self.slots.len()) as u64;
			return;
		}

		let victim = self
			.slots
			.iter()
			.min_by_key(|(_, slot)| slot.last_used)
			.map(|(title, _)| title.clone());
		if let Some(victim) = victim {
			self.slots.remove(&victim);
			self.stats.evictions += 1;
		}
	}
}
