//! Query and reduction types shared between the analytics and database layers

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::{MetricRecord, TraceEntry};

/// Symbolic reporting window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFrame {
    /// Trailing 7 days
    #[default]
    Weekly,
    /// Trailing 30 days
    Monthly,
    /// Trailing 365 days
    Yearly,
}

impl TimeFrame {
    /// Resolve a keyword, treating anything unrecognized as weekly
    pub fn parse_lenient(keyword: &str) -> Self {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "monthly" => Self::Monthly,
            "yearly" => Self::Yearly,
            _ => Self::Weekly,
        }
    }

    /// Number of days the window reaches back from the reference day
    pub fn days_back(self) -> i64 {
        match self {
            Self::Weekly => 7,
            Self::Monthly => 30,
            Self::Yearly => 365,
        }
    }

    /// Lowercase label
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl From<Option<&str>> for TimeFrame {
    fn from(keyword: Option<&str>) -> Self {
        keyword.map_or(Self::Weekly, Self::parse_lenient)
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed UTC interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Inclusive start
    pub start: DateTime<Utc>,
    /// Inclusive end
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Create a range from two instants
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The whole calendar day, `00:00:00.000` to `23:59:59.999`
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: start_of_day(date),
            end: end_of_day(date),
        }
    }

    /// Whether `instant` falls inside the range, bounds included
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Length of the closed interval at millisecond resolution
    pub fn length(&self) -> Duration {
        self.end - self.start + Duration::milliseconds(1)
    }

    /// The window of equal length ending right before this one starts
    #[must_use]
    pub fn preceding(&self) -> Self {
        let length = self.length();
        Self {
            start: self.start - length,
            end: self.start - Duration::milliseconds(1),
        }
    }
}

/// `00:00:00.000` UTC of `date`
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// `23:59:59.999` UTC of `date`
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + Duration::days(1) - Duration::milliseconds(1)
}

/// How a query constrains `apiName`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ApiFilter {
    /// Every API
    #[default]
    Any,
    /// Only records of this API
    Named(String),
    /// Only records without an API name
    Unnamed,
}

impl ApiFilter {
    /// Filter matching a group's key: named groups by name, the unnamed group by absence
    pub fn for_group(api_name: Option<&str>) -> Self {
        api_name.map_or(Self::Unnamed, |name| Self::Named(name.to_string()))
    }

    /// Whether a record's API name passes this filter
    pub fn matches(&self, api_name: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::Named(name) => api_name == Some(name.as_str()),
            Self::Unnamed => api_name.is_none(),
        }
    }
}

/// The entity a report is about
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    /// Namespace of the service unit
    pub namespace: String,
    /// Container of the service unit
    pub container: String,
    /// Optional restriction to one API
    pub api: ApiFilter,
}

impl Scope {
    /// Scope covering every API of a container
    pub fn container(namespace: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            container: container.into(),
            api: ApiFilter::Any,
        }
    }

    /// Narrow the scope to one API filter
    #[must_use]
    pub fn with_api(mut self, api: ApiFilter) -> Self {
        self.api = api;
        self
    }

    /// Combine with a time range into a store filter
    pub fn during(&self, range: DateRange) -> RecordFilter {
        RecordFilter {
            scope: self.clone(),
            range,
        }
    }
}

/// Exact-match plus timestamp-range filter sent to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    /// Entity constraints
    pub scope: Scope,
    /// Timestamp range, bounds included
    pub range: DateRange,
}

impl RecordFilter {
    /// Whether a record passes the filter
    pub fn matches(&self, record: &MetricRecord) -> bool {
        self.range.contains(record.timestamp)
            && record.namespace == self.scope.namespace
            && record.container == self.scope.container
            && self.scope.api.matches(record.api_name.as_deref())
    }
}

/// Grouping applied by a group-reduce query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    /// Every matching record in one group; traces are not collected
    None,
    /// One group per `apiName`; traces are collected per record
    ApiName,
}

/// Reduced fields of one group returned by the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupReduction {
    /// Group key; `None` for the single group or for records without an API name
    pub api_name: Option<String>,
    /// Number of records in the group
    pub count: u64,
    /// Sum of `totalEnergy_J`
    pub total_energy: f64,
    /// Sum of `cpuEnergy_J`
    pub cpu_energy: f64,
    /// Sum of `ramEnergy_J`
    pub ram_energy: f64,
    /// Average of `total_executionTime_MS`
    pub avg_execution_time: f64,
    /// Sum of `memoryUsed_MB`
    pub memory_sum: f64,
    /// Average of `memoryUsed_MB`
    pub memory_avg: f64,
    /// `methodName` of the earliest record
    pub first_method: Option<String>,
    /// Each record's trace, in record order (empty for [`GroupKey::None`])
    pub traces: Vec<Vec<TraceEntry>>,
}

/// Numeric summary of a filtered window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EnergySummary {
    /// Summed total energy (J)
    pub total_energy: f64,
    /// Summed CPU energy (J)
    pub cpu_energy: f64,
    /// Summed RAM energy (J)
    pub ram_energy: f64,
    /// Average execution time (ms)
    pub avg_execution_time: f64,
    /// Summed memory (MB)
    pub memory_used: f64,
    /// Number of matching records
    pub count: u64,
}

impl From<&GroupReduction> for EnergySummary {
    fn from(group: &GroupReduction) -> Self {
        Self {
            total_energy: group.total_energy,
            cpu_energy: group.cpu_energy,
            ram_energy: group.ram_energy,
            avg_execution_time: group.avg_execution_time,
            memory_used: group.memory_sum,
            count: group.count,
        }
    }
}

/// One API's share of a container's window
#[derive(Debug, Clone, PartialEq)]
pub struct ApiGroup {
    /// API name, `None` for records without one
    pub api_name: Option<String>,
    /// First observed HTTP method
    pub method: Option<String>,
    /// Summed and averaged metrics of the group
    pub summary: EnergySummary,
    /// Average memory per record (MB)
    pub avg_memory_used: f64,
    /// Traces of every record in the group
    pub traces: Vec<Vec<TraceEntry>>,
}

impl From<GroupReduction> for ApiGroup {
    fn from(group: GroupReduction) -> Self {
        let summary = EnergySummary::from(&group);
        Self {
            api_name: group.api_name,
            method: group.first_method,
            summary,
            avg_memory_used: group.memory_avg,
            traces: group.traces,
        }
    }
}

/// Raw records of a range query
#[derive(Debug, Clone, Serialize)]
pub struct RecordsPage {
    /// Number of records returned
    pub count: usize,
    /// Records, newest first
    pub records: Vec<MetricRecord>,
}

impl From<Vec<MetricRecord>> for RecordsPage {
    fn from(records: Vec<MetricRecord>) -> Self {
        Self {
            count: records.len(),
            records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_time_frame_fallback() {
        assert_eq!(TimeFrame::parse_lenient("monthly"), TimeFrame::Monthly);
        assert_eq!(TimeFrame::parse_lenient("YEARLY"), TimeFrame::Yearly);
        assert_eq!(TimeFrame::parse_lenient("fortnightly"), TimeFrame::Weekly);
        assert_eq!(TimeFrame::from(None), TimeFrame::Weekly);
    }

    #[test]
    fn test_day_bounds() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 3).unwrap();
        let day = DateRange::day(date);

        assert_eq!(day.start, Utc.with_ymd_and_hms(2025, 5, 3, 0, 0, 0).unwrap());
        assert_eq!(
            day.end,
            Utc.with_ymd_and_hms(2025, 5, 3, 23, 59, 59).unwrap() + Duration::milliseconds(999)
        );
        assert_eq!(day.length(), Duration::days(1));
    }

    #[test]
    fn test_preceding_window_is_adjacent_and_equal_length() {
        let range = DateRange::new(
            start_of_day(NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()),
            end_of_day(NaiveDate::from_ymd_opt(2025, 5, 8).unwrap()),
        );
        let previous = range.preceding();

        assert_eq!(previous.length(), range.length());
        assert_eq!(previous.end + Duration::milliseconds(1), range.start);
        assert!(!previous.contains(range.start));
        assert_eq!(previous.start, start_of_day(NaiveDate::from_ymd_opt(2025, 4, 23).unwrap()));
    }

    #[test]
    fn test_api_filter() {
        assert!(ApiFilter::Any.matches(None));
        assert!(ApiFilter::Named("a".into()).matches(Some("a")));
        assert!(!ApiFilter::Named("a".into()).matches(None));
        assert!(ApiFilter::Unnamed.matches(None));
        assert!(!ApiFilter::Unnamed.matches(Some("a")));
        assert_eq!(ApiFilter::for_group(None), ApiFilter::Unnamed);
    }

    #[test]
    fn test_record_filter_matches() {
        let ts = Utc.with_ymd_and_hms(2025, 5, 3, 12, 0, 0).unwrap();
        let filter = Scope::container("ns", "c").during(DateRange::day(ts.date_naive()));

        assert!(filter.matches(&MetricRecord::new(ts, "ns", "c")));
        assert!(!filter.matches(&MetricRecord::new(ts, "ns", "other")));
        assert!(!filter.matches(&MetricRecord::new(ts + Duration::days(1), "ns", "c")));
    }
}
