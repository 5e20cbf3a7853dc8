//! # Dashboard Query Layer
//!
//! The logistician dashboard is driven entirely by URL query parameters:
//! free text `q`, `status`, a `from`/`to` date range, a `sort` key with a
//! `dir`, a `page` number and an optional `sel` selection. The repository
//! returns the full list; this module filters, sorts and paginates it.
//!
//! Pagination is self-correcting: a page beyond the last valid one clamps
//! to the last page and flags the result so the caller can redirect,
//! never rendering an empty out-of-range page silently.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::accreditation::Accreditation;
use crate::status::duration_on_site;

/// Fixed number of rows per dashboard page.
pub const PAGE_SIZE: usize = 15;

/// Sort keys supported by the dashboard table. Unknown keys fall back
/// to [`SortKey::CreatedAt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Status,
    Id,
    CreatedAt,
    Company,
    Stand,
    Event,
    EntryAt,
    ExitAt,
    /// `exit_at - entry_at`, zero when either timestamp is missing.
    Duration,
}

impl SortKey {
    /// Parse a query-string sort key, falling back to `createdAt`.
    pub fn parse(s: &str) -> Self {
        match s {
            "status" => SortKey::Status,
            "id" => SortKey::Id,
            "createdAt" => SortKey::CreatedAt,
            "company" => SortKey::Company,
            "stand" => SortKey::Stand,
            "event" => SortKey::Event,
            "entryAt" => SortKey::EntryAt,
            "exitAt" => SortKey::ExitAt,
            "duration" => SortKey::Duration,
            _ => SortKey::CreatedAt,
        }
    }
}

/// Sort direction; `dir=desc` flips the comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    /// Parse a query-string direction; anything but `desc` is ascending.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("desc") {
            SortDir::Desc
        } else {
            SortDir::Asc
        }
    }
}

/// Raw dashboard query parameters, straight from the URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardParams {
    /// Free-text search.
    pub q: Option<String>,
    /// Exact status filter; empty or `all` disables it.
    pub status: Option<String>,
    /// Range start, `YYYY-MM-DD`, inclusive from start of day.
    pub from: Option<String>,
    /// Range end, `YYYY-MM-DD`, inclusive to end of day.
    pub to: Option<String>,
    /// Sort key; unknown values fall back to `createdAt`.
    pub sort: Option<String>,
    /// `asc` or `desc`.
    pub dir: Option<String>,
    /// 1-based page number.
    pub page: Option<usize>,
    /// Explicit selection for the side panel.
    pub sel: Option<Uuid>,
}

/// One resolved dashboard page.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardPage {
    /// Rows of the current page, at most [`PAGE_SIZE`].
    pub rows: Vec<Accreditation>,
    /// The page actually rendered (clamped).
    pub page: usize,
    /// Total pages for the filtered set, at least 1.
    pub total_pages: usize,
    /// Total filtered rows across all pages.
    pub total: usize,
    /// Record shown in the side panel: the explicit `sel` when it is on
    /// this page, else the first row.
    pub selected: Option<Uuid>,
    /// The requested page was out of range and was clamped; callers
    /// should redirect to `page`.
    pub redirected: bool,
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_micro_opt(23, 59, 59, 999_999).unwrap())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Resolve the inclusive `[start, end]` bounds of the date filter,
/// swapping the endpoints when the user inverted them.
fn date_bounds(params: &DashboardParams) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let from = params.from.as_deref().and_then(parse_date);
    let to = params.to.as_deref().and_then(parse_date);
    match (from, to) {
        (Some(a), Some(b)) if a > b => (Some(start_of_day(b)), Some(end_of_day(a))),
        (f, t) => (f.map(start_of_day), t.map(end_of_day)),
    }
}

fn matches_free_text(acc: &Accreditation, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    if acc.id.to_string().to_lowercase().contains(&needle) {
        return true;
    }
    if let Some(vehicle) = acc.vehicles.first() {
        if vehicle.plate.to_lowercase().contains(&needle) {
            return true;
        }
    }
    if acc.status.label().to_lowercase().contains(&needle) {
        return true;
    }
    acc.created_at
        .format("%d/%m/%Y")
        .to_string()
        .contains(&needle)
}

fn passes_filters(
    acc: &Accreditation,
    params: &DashboardParams,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> bool {
    if let Some(status) = params.status.as_deref() {
        if !status.is_empty() && status != "all" && acc.status.as_str() != status {
            return false;
        }
    }
    if let Some(start) = start {
        if acc.created_at < start {
            return false;
        }
    }
    if let Some(end) = end {
        if acc.created_at > end {
            return false;
        }
    }
    if let Some(q) = params.q.as_deref() {
        if !q.trim().is_empty() && !matches_free_text(acc, q.trim()) {
            return false;
        }
    }
    true
}

fn compare(a: &Accreditation, b: &Accreditation, key: SortKey) -> std::cmp::Ordering {
    match key {
        SortKey::Status => a.status.as_str().cmp(b.status.as_str()),
        SortKey::Id => a.id.to_string().cmp(&b.id.to_string()),
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::Company => a.company.to_lowercase().cmp(&b.company.to_lowercase()),
        SortKey::Stand => a.stand.to_lowercase().cmp(&b.stand.to_lowercase()),
        SortKey::Event => a.event.as_str().cmp(b.event.as_str()),
        SortKey::EntryAt => a.entry_at.cmp(&b.entry_at),
        SortKey::ExitAt => a.exit_at.cmp(&b.exit_at),
        SortKey::Duration => {
            let da = duration_on_site(a.entry_at, a.exit_at).map_or(0, |d| d.num_seconds());
            let db = duration_on_site(b.entry_at, b.exit_at).map_or(0, |d| d.num_seconds());
            da.cmp(&db)
        }
    }
}

/// Filter, sort and paginate the full accreditation list.
///
/// When `sort` is absent the table shows newest first; an explicit sort
/// key defaults to ascending unless `dir=desc`.
pub fn run(params: &DashboardParams, list: &[Accreditation]) -> DashboardPage {
    let (start, end) = date_bounds(params);

    let mut rows: Vec<Accreditation> = list
        .iter()
        .filter(|acc| passes_filters(acc, params, start, end))
        .cloned()
        .collect();

    let (key, dir) = match params.sort.as_deref() {
        Some(s) => (
            SortKey::parse(s),
            params.dir.as_deref().map_or(SortDir::Asc, SortDir::parse),
        ),
        None => (
            SortKey::CreatedAt,
            params.dir.as_deref().map_or(SortDir::Desc, SortDir::parse),
        ),
    };
    rows.sort_by(|a, b| {
        let ord = compare(a, b, key);
        match dir {
            SortDir::Asc => ord,
            SortDir::Desc => ord.reverse(),
        }
    });

    let total = rows.len();
    let total_pages = std::cmp::max(1, total.div_ceil(PAGE_SIZE));
    let requested = params.page.unwrap_or(1).max(1);
    let page = requested.min(total_pages);
    let redirected = page != params.page.unwrap_or(1);

    let offset = (page - 1) * PAGE_SIZE;
    let rows: Vec<Accreditation> = rows.into_iter().skip(offset).take(PAGE_SIZE).collect();

    let selected = params
        .sel
        .filter(|sel| rows.iter().any(|acc| acc.id == *sel))
        .or_else(|| rows.first().map(|acc| acc.id));

    DashboardPage {
        rows,
        page,
        total_pages,
        total,
        selected,
        redirected,
    }
}
