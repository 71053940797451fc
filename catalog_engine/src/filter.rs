//! Catalog filters.
//!
//! [`FilterSpec`] is the normalized form the query engine evaluates. Every
//! group is either inactive or fully parameterized, so "absent" can never be
//! confused with "active but empty". [`FilterRequest`] is the nullable JSON
//! shape callers send, and converts into a `FilterSpec`.

use std::collections::HashSet;

use chrono::{FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{geo, FileRecord, FileType};

/// Time zone whose calendar days bound date filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalendarZone {
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl CalendarZone {
    pub fn utc() -> Self {
        CalendarZone::Fixed(Utc.fix())
    }

    /// Epoch-second bounds of `date`, from 00:00:00.000 to 23:59:59.999.
    ///
    /// Timestamps are whole seconds, so the inclusive end is 23:59:59.
    pub fn day_window(&self, date: NaiveDate) -> (i64, i64) {
        match self {
            CalendarZone::Local => window_in(&Local, date),
            CalendarZone::Fixed(offset) => window_in(offset, date),
        }
    }
}

fn window_in<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> (i64, i64) {
    let start = date.and_time(NaiveTime::MIN);
    let end = start + TimeDelta::seconds(86_399);

    let step = TimeDelta::minutes(GAP_STEP_MINUTES);
    let first = nearest_valid(tz, start, step)
        .and_then(|t| tz.from_local_datetime(&t).earliest())
        .map(|t| t.timestamp())
        .unwrap_or_else(|| Utc.from_utc_datetime(&start).timestamp());
    let last = nearest_valid(tz, end, -step)
        .and_then(|t| tz.from_local_datetime(&t).latest())
        .map(|t| t.timestamp())
        .unwrap_or_else(|| Utc.from_utc_datetime(&end).timestamp());

    (first, last)
}

const GAP_STEP_MINUTES: i64 = 15;
const GAP_PROBES: i32 = 48;

/// Walks away from a local time skipped by a DST jump until it exists.
fn nearest_valid<Tz: TimeZone>(
    tz: &Tz,
    local: NaiveDateTime,
    step: TimeDelta,
) -> Option<NaiveDateTime> {
    (0..=GAP_PROBES)
        .map(|i| local + step * i)
        .find(|t| tz.from_local_datetime(t).earliest().is_some())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateRange {
    #[default]
    Inactive,
    Active { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GeoFilter {
    #[default]
    Inactive,
    Active {
        latitude: f64,
        longitude: f64,
        radius_meters: f64,
    },
}

impl GeoFilter {
    /// A zero latitude or longitude counts as missing and leaves the filter
    /// inactive.
    pub fn around(latitude: f64, longitude: f64, radius_meters: f64) -> Self {
        if latitude == 0.0 || longitude == 0.0 {
            return GeoFilter::Inactive;
        }
        GeoFilter::Active {
            latitude,
            longitude,
            radius_meters,
        }
    }

    fn center(&self) -> Option<(f64, f64, f64)> {
        match *self {
            GeoFilter::Active {
                latitude,
                longitude,
                radius_meters,
            } if latitude != 0.0 && longitude != 0.0 => Some((latitude, longitude, radius_meters)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterSpec {
    pub date_range: DateRange,
    pub location: GeoFilter,
    /// `Some` restricts results to these hashes; an empty set matches nothing.
    pub hash_list: Option<HashSet<String>>,
    pub exclude_hash_list: Option<HashSet<String>>,
    pub file_type: Option<FileType>,
    /// Case-insensitive substring of the source URI.
    pub file_name: Option<String>,
    /// Matches records created on any of these days.
    pub single_dates: Vec<NaiveDate>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = DateRange::Active { start, end };
        self
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64, radius_meters: f64) -> Self {
        self.location = GeoFilter::around(latitude, longitude, radius_meters);
        self
    }

    pub fn with_hashes<I, S>(mut self, hashes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hash_list = Some(hashes.into_iter().map(Into::into).collect());
        self
    }

    pub fn without_hashes<I, S>(mut self, hashes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_hash_list = Some(hashes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_file_type(mut self, file_type: FileType) -> Self {
        self.file_type = Some(file_type);
        self
    }

    /// An empty name leaves the filter inactive.
    pub fn with_file_name(mut self, name: &str) -> Self {
        self.file_name = (!name.is_empty()).then(|| name.to_string());
        self
    }

    pub fn with_single_dates(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.single_dates = dates.into_iter().collect();
        self
    }

    /// Resolves calendar days once so the per-record check is plain integer
    /// comparisons.
    pub fn compile(&self, zone: CalendarZone) -> CompiledFilter<'_> {
        let date_window = match self.date_range {
            DateRange::Inactive => None,
            DateRange::Active { start, end } => {
                Some((zone.day_window(start).0, zone.day_window(end).1))
            }
        };

        CompiledFilter {
            spec: self,
            date_window,
            location: self.location.center(),
            file_name: self
                .file_name
                .as_deref()
                .filter(|n| !n.is_empty())
                .map(str::to_lowercase),
            day_windows: self.single_dates.iter().map(|d| zone.day_window(*d)).collect(),
        }
    }
}

/// A [`FilterSpec`] with its day boundaries resolved against a time zone.
#[derive(Debug)]
pub struct CompiledFilter<'a> {
    spec: &'a FilterSpec,
    date_window: Option<(i64, i64)>,
    location: Option<(f64, f64, f64)>,
    file_name: Option<String>,
    day_windows: Vec<(i64, i64)>,
}

impl CompiledFilter<'_> {
    pub fn matches(&self, file: &FileRecord) -> bool {
        let spec = self.spec;

        if let Some(excluded) = &spec.exclude_hash_list {
            if excluded.contains(&file.hash) {
                return false;
            }
        }

        if let Some(allowed) = &spec.hash_list {
            if !allowed.contains(&file.hash) {
                return false;
            }
        }

        if let Some(file_type) = spec.file_type {
            if file.file_type != file_type {
                return false;
            }
        }

        if let Some((start, end)) = self.date_window {
            if !(start..=end).contains(&file.created_at_timestamp) {
                return false;
            }
        }

        if let Some((latitude, longitude, radius_meters)) = self.location {
            if file.geohash.is_empty()
                || !geo::is_within_radius(&file.geohash, latitude, longitude, radius_meters)
            {
                return false;
            }
        }

        if let Some(name) = &self.file_name {
            if !file.source_uri.to_lowercase().contains(name.as_str()) {
                return false;
            }
        }

        if !self.day_windows.is_empty() {
            let ts = file.created_at_timestamp;
            if !self.day_windows.iter().any(|(start, end)| (*start..=*end).contains(&ts)) {
                return false;
            }
        }

        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeRequest {
    pub active: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeohashRequest {
    pub active: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub radius: f64,
}

/// Filter as sent over the wire. Groups a caller does not use are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRequest {
    #[serde(default)]
    pub date_range: DateRangeRequest,
    #[serde(default)]
    pub geohash: GeohashRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_list: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_hash_list: Option<Vec<String>>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub file_type: Option<FileType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_date_list: Option<Vec<NaiveDate>>,
}

impl From<FilterRequest> for FilterSpec {
    fn from(request: FilterRequest) -> Self {
        let date_range = match request.date_range {
            DateRangeRequest {
                active: true,
                start_date: Some(start),
                end_date: Some(end),
            } => DateRange::Active { start, end },
            _ => DateRange::Inactive,
        };

        let location = match request.geohash {
            GeohashRequest {
                active: true,
                latitude: Some(latitude),
                longitude: Some(longitude),
                radius,
            } => GeoFilter::around(latitude, longitude, radius),
            _ => GeoFilter::Inactive,
        };

        FilterSpec {
            date_range,
            location,
            hash_list: request.hash_list.map(|h| h.into_iter().collect()),
            exclude_hash_list: request.exclude_hash_list.map(|h| h.into_iter().collect()),
            file_type: request.file_type,
            file_name: request.file_name.filter(|n| !n.is_empty()),
            single_dates: request.single_date_list.unwrap_or_default(),
        }
    }
}
