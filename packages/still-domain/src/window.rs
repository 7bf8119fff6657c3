use time::{Duration, OffsetDateTime};

/// Half-open time range `[start, end)` addressed by its distance from the present.
///
/// Offset 0 is the window ending at the partition anchor; offset `k` ends `k` window lengths
/// earlier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
	pub offset: u32,
	pub start: OffsetDateTime,
	pub end: OffsetDateTime,
}
impl Window {
	pub fn new(offset: u32, start: OffsetDateTime, end: OffsetDateTime) -> Self {
		Self { offset, start, end }
	}

	pub fn start_ts(&self) -> i64 {
		self.start.unix_timestamp()
	}

	pub fn end_ts(&self) -> i64 {
		self.end.unix_timestamp()
	}

	pub fn contains_ts(&self, ts: i64) -> bool {
		ts >= self.start_ts() && ts < self.end_ts()
	}

	pub fn duration(&self) -> Duration {
		self.end - self.start
	}
}

/// Splits `[anchor - count * length, anchor)` into `count` adjacent windows, most recent first.
///
/// Returns `None` when the earliest window would start outside the supported date range.
pub fn partition(anchor: OffsetDateTime, count: u32, length: Duration) -> Option<Vec<Window>> {
	let span = length.checked_mul(i32::try_from(count).ok()?)?;

	anchor.checked_sub(span)?;

	(0..count)
		.map(|offset| {
			let back = length.checked_mul(i32::try_from(offset).ok()?)?;
			let end = anchor.checked_sub(back)?;
			let start = end.checked_sub(length)?;

			Some(Window::new(offset, start, end))
		})
		.collect()
}

pub fn partition_days(anchor: OffsetDateTime, day_count: u32) -> Option<Vec<Window>> {
	partition(anchor, day_count, Duration::DAY)
}
