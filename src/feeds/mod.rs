//! Per-feed configuration and row normalization.
//!
//! Every upstream (openFDA enforcement, CDC NORS, NWSS wastewater, USDA-FSIS,
//! FDA Data Dashboard) gets one [`FeedProfile`]: where it lives, how its rows
//! name their fields, how geography is encoded, and what to do with rows
//! whose value cannot be parsed. Handlers hold no feed-specific string
//! probing; it all lives here as data.

pub mod service;

use chrono::{DateTime, Utc};

use crate::aggregate::NormalizedEvent;
use crate::envelope::CachePolicy;
use crate::regions;
use crate::resolve::{self, RawRecord, RoleHint};
use crate::window;

/// What to do when the value role cannot be resolved or parsed for a row.
/// The upstreams are not internally consistent here, so it is a per-feed
/// decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuePolicy {
    /// Keep the row with value 0 (metric feeds where presence matters).
    Zero,
    /// Drop the row (feeds where a missing value means a junk row).
    DropRow,
}

/// How a row encodes geography.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionStyle {
    /// A two-letter code in the resolved `region` field.
    Code,
    /// Free text such as openFDA's `distribution_pattern`; parsed for state
    /// names, abbreviations, and "nationwide".
    FreeText,
    /// A comma- or pipe-separated list of codes (USDA-FSIS).
    List,
    /// Feed has no usable geography.
    None,
}

/// Where the upstream base URL comes from.
#[derive(Debug, Clone, Copy)]
pub enum UrlSource {
    Fixed(&'static str),
    Env(&'static str),
}

/// Upstream query dialect.
#[derive(Debug, Clone, Copy)]
pub enum UpstreamKind {
    /// openFDA GET with a `search=<field>:[YYYYMMDD+TO+YYYYMMDD]` range.
    /// Credential: `OPENFDA_API_KEY` as an `api_key` query parameter.
    OpenFda { date_field: &'static str },
    /// Socrata SoQL GET. Candidate date/state column pairs are tried in
    /// order until one answers with a JSON array; the bare base URL is the
    /// last resort. Credential: `CDC_APP_TOKEN` as `X-App-Token`.
    Socrata {
        date_columns: &'static [&'static str],
        state_columns: &'static [&'static str],
    },
    /// Plain GET, everything normalized locally (USDA-FSIS).
    Plain,
    /// FDA Data Dashboard style POST-only interface. Credentials come from
    /// the named environment variables and are sent as `Authorization-User`
    /// / `Authorization-Key` headers; the dashboard and IRES endpoints use
    /// separate credential pairs.
    DataDashboard {
        date_field: &'static str,
        columns: &'static [&'static str],
        auth_user_env: &'static str,
        auth_key_env: &'static str,
    },
}

/// Static description of one upstream feed.
#[derive(Debug, Clone)]
pub struct FeedProfile {
    pub id: &'static str,
    pub name: &'static str,
    pub source: &'static str,
    pub base: UrlSource,
    pub kind: UpstreamKind,
    /// Upper clamp for the months-back window.
    pub months_max: u32,
    pub default_months: u32,
    pub cache: CachePolicy,
    pub value_policy: ValuePolicy,
    pub region_style: RegionStyle,
    pub hints: &'static [RoleHint],
    /// Synthesize `YYYY-MM-01` from `year`/`month` roles when the date role
    /// fails (NORS exports that only carry year/month).
    pub year_month_fallback: bool,
}

/// Geographic filter for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Us,
    State(String),
}

impl Scope {
    /// `"US"` (or empty) is nationwide; any tracked two-letter code narrows
    /// to that state. Untracked codes are rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let up = raw.trim().to_uppercase();
        if up.is_empty() || up == "US" {
            return Some(Scope::Us);
        }
        regions::is_tracked(&up).then_some(Scope::State(up))
    }
}

/// Case-insensitive substring test applied to a resolved role after fetch.
#[derive(Debug, Clone)]
pub struct TextFilter {
    pub role: &'static str,
    pub needle: String,
}

/// One request against a feed: scope, window, post-fetch text filters.
#[derive(Debug, Clone)]
pub struct FeedQuery {
    pub scope: Scope,
    pub months: Option<i64>,
    pub filters: Vec<TextFilter>,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            scope: Scope::Us,
            months: None,
            filters: Vec::new(),
        }
    }
}

static RECALL_HINTS: &[RoleHint] = &[
    RoleHint::with_fallback("date", &["report_date", "recall_initiation_date", "date"], "date"),
    RoleHint::new("id", &["recall_number", "event_id", "id"]),
    RoleHint::with_fallback(
        "category",
        &["product_description", "product", "title", "description"],
        "product",
    ),
    RoleHint::new("reason", &["reason_for_recall", "summary", "reason"]),
    RoleHint::new("classification", &["classification"]),
    RoleHint::new("region", &["distribution_pattern"]),
];

static OUTBREAK_HINTS: &[RoleHint] = &[
    RoleHint::with_fallback("date", &["event_date", "date", "first_illness_date"], "date"),
    RoleHint::new("id", &["incident_id", "id"]),
    RoleHint::new("category", &["etiology", "pathogen", "agent"]),
    RoleHint::with_fallback("value", &["illnesses", "illness", "case_count"], "illness"),
    RoleHint::new("region", &["state", "reporting_state"]),
    RoleHint::new("year", &["year"]),
    RoleHint::new("month", &["month"]),
];

static WASTEWATER_HINTS: &[RoleHint] = &[
    RoleHint::with_fallback(
        "date",
        &["date", "submission_date", "sample_date", "week_start", "week", "day"],
        "date",
    ),
    RoleHint::new("id", &["sample_id", "id"]),
    RoleHint::with_fallback(
        "value",
        &[
            "wastewater_percentile",
            "percentile",
            "value",
            "wastewater_percentile_7d",
            "median",
        ],
        "percentile",
    ),
    RoleHint::new("region", &["state", "state_abbreviation", "wwtp_jurisdiction"]),
    RoleHint::new("detected", &["detectable", "detected"]),
];

static FSIS_HINTS: &[RoleHint] = &[
    RoleHint::with_fallback(
        "date",
        &["recall_initiation_date", "start_date", "date", "recalldate"],
        "date",
    ),
    RoleHint::new("id", &["recall_number", "recallid", "id"]),
    RoleHint::with_fallback(
        "category",
        &["product_description", "product", "title", "description"],
        "product",
    ),
    RoleHint::new("reason", &["reason_for_recall", "summary", "reason"]),
    RoleHint::new("region", &["states", "state"]),
];

static ADVERSE_EVENT_HINTS: &[RoleHint] = &[
    RoleHint::with_fallback("date", &["date_created", "date_started", "report_date"], "date"),
    RoleHint::new("id", &["report_number", "id"]),
    RoleHint::with_fallback("category", &["product", "name_brand", "industry_name"], "product"),
];

static WARNING_LETTER_HINTS: &[RoleHint] = &[
    RoleHint::with_fallback("date", &["date", "posted"], "date"),
    RoleHint::new("id", &["id", "letter_id"]),
    RoleHint::new("category", &["subject", "title"]),
    RoleHint::new("firm", &["firm", "company"]),
];

static FSIS_ALERT_HINTS: &[RoleHint] = &[
    RoleHint::with_fallback("date", &["date", "recall_initiation_date"], "date"),
    RoleHint::new("id", &["id", "recall_number"]),
    RoleHint::with_fallback("category", &["product_description", "product", "title"], "product"),
    RoleHint::new("reason", &["summary", "reason"]),
    RoleHint::new("region", &["states", "state_scope", "state"]),
];

static ENFORCEMENT_HINTS: &[RoleHint] = &[
    RoleHint::with_fallback(
        "date",
        &["recallinitiationdt", "enforcementreportdt", "postedinternetdt"],
        "date",
    ),
    RoleHint::new("id", &["recallnum", "recalleventid", "productid"]),
    RoleHint::with_fallback(
        "category",
        &["productdescriptiontxt", "productdescription"],
        "product",
    ),
    RoleHint::new("reason", &["productshortreasontxt", "reason"]),
    RoleHint::new("classification", &["centerclassificationtypetxt", "classification"]),
    RoleHint::new("firm", &["firmlegalnam", "firm"]),
    RoleHint::new("region", &["distributionareasummarytxt", "distribution"]),
];

static IMPORT_REFUSAL_HINTS: &[RoleHint] = &[
    RoleHint::with_fallback("date", &["refusaldate", "refusal_date"], "date"),
    RoleHint::new("id", &["feinumber", "id"]),
    RoleHint::with_fallback(
        "category",
        &["productcode", "product_code", "industry"],
        "product",
    ),
    RoleHint::new("reason", &["refusalcharges", "charges"]),
    RoleHint::new("region", &["countryname"]),
];

/// All configured feeds. Order is presentation order, nothing more.
pub fn registry() -> Vec<FeedProfile> {
    vec![
        FeedProfile {
            id: "recalls",
            name: "FDA food enforcement recalls",
            source: "FDA openFDA",
            base: UrlSource::Fixed("https://api.fda.gov/food/enforcement.json"),
            kind: UpstreamKind::OpenFda {
                date_field: "report_date",
            },
            months_max: 12,
            default_months: 6,
            cache: CachePolicy::new(3600, 86_400),
            value_policy: ValuePolicy::DropRow,
            region_style: RegionStyle::FreeText,
            hints: RECALL_HINTS,
            year_month_fallback: false,
        },
        FeedProfile {
            id: "outbreaks",
            name: "CDC NORS foodborne outbreaks",
            source: "CDC NORS",
            base: UrlSource::Env("CDC_NORS_URL"),
            kind: UpstreamKind::Socrata {
                date_columns: &["event_date", "date"],
                state_columns: &["state", "reporting_state"],
            },
            months_max: 12,
            default_months: 6,
            cache: CachePolicy::new(300, 86_400),
            value_policy: ValuePolicy::Zero,
            region_style: RegionStyle::Code,
            hints: OUTBREAK_HINTS,
            year_month_fallback: true,
        },
        FeedProfile {
            id: "wastewater",
            name: "CDC NWSS wastewater percentile",
            source: "CDC NWSS",
            base: UrlSource::Env("NWSS_API_URL"),
            kind: UpstreamKind::Socrata {
                date_columns: &["date", "submission_date"],
                state_columns: &["state", "state_abbreviation"],
            },
            months_max: 12,
            default_months: 6,
            cache: CachePolicy::new(1800, 86_400),
            value_policy: ValuePolicy::Zero,
            region_style: RegionStyle::Code,
            hints: WASTEWATER_HINTS,
            year_month_fallback: false,
        },
        FeedProfile {
            id: "fsis",
            name: "USDA-FSIS recalls and alerts",
            source: "USDA FSIS",
            base: UrlSource::Env("FSIS_API_URL"),
            kind: UpstreamKind::Plain,
            months_max: 12,
            default_months: 6,
            cache: CachePolicy::new(600, 86_400),
            value_policy: ValuePolicy::DropRow,
            region_style: RegionStyle::List,
            hints: FSIS_HINTS,
            year_month_fallback: false,
        },
        FeedProfile {
            id: "adverse-events",
            name: "FDA CAERS food adverse events",
            source: "FDA CAERS",
            base: UrlSource::Fixed("https://api.fda.gov/food/event.json"),
            kind: UpstreamKind::OpenFda {
                date_field: "date_created",
            },
            months_max: 36,
            default_months: 12,
            cache: CachePolicy::new(3600, 86_400),
            value_policy: ValuePolicy::DropRow,
            region_style: RegionStyle::None,
            hints: ADVERSE_EVENT_HINTS,
            year_month_fallback: false,
        },
        FeedProfile {
            id: "import-refusals",
            name: "FDA import refusals",
            source: "FDA Data Dashboard",
            base: UrlSource::Fixed("https://api-datadashboard.fda.gov/v1/import_refusals"),
            kind: UpstreamKind::DataDashboard {
                date_field: "RefusalDate",
                columns: &[
                    "RefusalDate",
                    "FirmName",
                    "CountryName",
                    "ProductCode",
                    "FEINumber",
                    "RefusalCharges",
                ],
                auth_user_env: "FDA_DD_AUTH_USER",
                auth_key_env: "FDA_DD_AUTH_KEY",
            },
            months_max: 24,
            default_months: 6,
            cache: CachePolicy::new(300, 7_200),
            value_policy: ValuePolicy::DropRow,
            region_style: RegionStyle::None,
            hints: IMPORT_REFUSAL_HINTS,
            year_month_fallback: false,
        },
        FeedProfile {
            id: "warning-letters",
            name: "FDA warning letters",
            source: "FDA Warning Letters",
            base: UrlSource::Env("FDA_WARNING_LETTERS_URL"),
            kind: UpstreamKind::Plain,
            months_max: 12,
            default_months: 6,
            cache: CachePolicy::new(86_400, 172_800),
            value_policy: ValuePolicy::DropRow,
            region_style: RegionStyle::None,
            hints: WARNING_LETTER_HINTS,
            year_month_fallback: false,
        },
        FeedProfile {
            id: "fsis-alerts",
            name: "USDA-FSIS public health alerts",
            source: "USDA FSIS PHA",
            base: UrlSource::Env("FSIS_PHA_URL"),
            kind: UpstreamKind::Plain,
            months_max: 12,
            default_months: 6,
            cache: CachePolicy::new(3600, 86_400),
            value_policy: ValuePolicy::DropRow,
            region_style: RegionStyle::List,
            hints: FSIS_ALERT_HINTS,
            year_month_fallback: false,
        },
        FeedProfile {
            id: "fda-enforcement",
            name: "FDA IRES enforcement recalls",
            source: "FDA IRES",
            base: UrlSource::Fixed("https://www.accessdata.fda.gov/rest/iresapi/recalls/"),
            kind: UpstreamKind::DataDashboard {
                date_field: "eventlmd",
                columns: &[
                    "recallnum",
                    "recallinitiationdt",
                    "productdescriptiontxt",
                    "productshortreasontxt",
                    "centerclassificationtypetxt",
                    "firmlegalnam",
                    "distributionareasummarytxt",
                ],
                auth_user_env: "FDA_ENFORCEMENT_AUTH_USER",
                auth_key_env: "FDA_ENFORCEMENT_AUTH_KEY",
            },
            months_max: 36,
            default_months: 6,
            cache: CachePolicy::new(600, 7_200),
            value_policy: ValuePolicy::DropRow,
            region_style: RegionStyle::FreeText,
            hints: ENFORCEMENT_HINTS,
            year_month_fallback: false,
        },
    ]
}

/// Looks a profile up by id.
pub fn profile(id: &str) -> Option<FeedProfile> {
    registry().into_iter().find(|p| p.id == id)
}

/// The window `[start, end]` a query spans for `profile` at `now`.
pub fn query_window(
    profile: &FeedProfile,
    query: &FeedQuery,
    now: DateTime<Utc>,
) -> (chrono::NaiveDate, chrono::NaiveDate) {
    let months = window::clamp_months(
        query.months.unwrap_or(i64::from(profile.default_months)),
        profile.months_max,
    );
    (window::window_start(now, months), now.date_naive())
}

/// Row-level geography decision: keep the row under `scope`, and which single
/// region code (if any) to record on the event.
fn region_for_scope(codes: &[String], scope: &Scope) -> Option<Option<String>> {
    let nationwide = codes.len() >= regions::REGIONS.len();
    match scope {
        Scope::Us => {
            let single = (codes.len() == 1 && !nationwide).then(|| codes[0].clone());
            Some(single)
        }
        Scope::State(st) => {
            if nationwide || codes.iter().any(|c| c == st) {
                Some(Some(st.clone()))
            } else {
                None
            }
        }
    }
}

/// Normalizes raw upstream rows into window-filtered [`NormalizedEvent`]s.
///
/// Rows whose date cannot be resolved or parsed are silently dropped; value
/// failures follow the profile's [`ValuePolicy`]; scope and text filters are
/// applied here, post-fetch.
pub fn normalize_rows(
    profile: &FeedProfile,
    rows: &[serde_json::Value],
    query: &FeedQuery,
    now: DateTime<Utc>,
) -> Vec<NormalizedEvent> {
    let (start, end) = query_window(profile, query, now);
    let mut out = Vec::new();

    'rows: for (i, raw) in rows.iter().enumerate() {
        let Some(obj) = raw.as_object() else { continue };
        let resolved = resolve::resolve(obj, profile.hints);

        let date = resolve::string_at(obj, &resolved, "date")
            .and_then(|s| window::parse_feed_date(&s))
            .or_else(|| {
                profile
                    .year_month_fallback
                    .then(|| year_month_date(obj, &resolved))
                    .flatten()
            });
        let Some(date) = date else { continue };
        if !window::in_window(date, start, end) {
            continue;
        }

        let value = if profile.hints.iter().any(|h| h.role == "value") {
            match resolve::number_at(obj, &resolved, "value") {
                Some(v) => v,
                None => match profile.value_policy {
                    ValuePolicy::Zero => 0.0,
                    ValuePolicy::DropRow => {
                        // Only drop when a value field exists but is junk;
                        // an unresolved role on a count-style feed means 1.
                        if resolved.contains_key("value") {
                            continue;
                        }
                        1.0
                    }
                },
            }
        } else {
            1.0
        };

        // Detection flag: explicit field wins, otherwise a positive value
        // counts as detected. Feeds without the hint get no flag at all.
        let detected = if profile.hints.iter().any(|h| h.role == "detected") {
            Some(
                resolve::string_at(obj, &resolved, "detected")
                    .map(|s| s.trim().eq_ignore_ascii_case("true"))
                    .unwrap_or(value > 0.0),
            )
        } else {
            None
        };

        let region = match profile.region_style {
            RegionStyle::None => match &query.scope {
                Scope::Us => None,
                Scope::State(_) => continue,
            },
            RegionStyle::Code => {
                let code = resolve::string_at(obj, &resolved, "region")
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| regions::is_tracked(s));
                match (&query.scope, &code) {
                    (Scope::State(st), Some(c)) if c != st => continue,
                    (Scope::State(_), None) => continue,
                    _ => code,
                }
            }
            RegionStyle::FreeText | RegionStyle::List => {
                let text = resolve::string_at(obj, &resolved, "region").unwrap_or_default();
                let codes: Vec<String> = match profile.region_style {
                    RegionStyle::FreeText => regions::parse_region_scope(&text)
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    _ => regions::split_region_list(&text)
                        .into_iter()
                        .filter(|c| regions::is_tracked(c))
                        .collect(),
                };
                match region_for_scope(&codes, &query.scope) {
                    Some(region) => region,
                    None => continue,
                }
            }
        };

        for filter in &query.filters {
            let hay = resolve::string_at(obj, &resolved, filter.role).unwrap_or_default();
            if !hay.to_lowercase().contains(&filter.needle.to_lowercase()) {
                continue 'rows;
            }
        }

        let id = resolve::string_at(obj, &resolved, "id")
            .unwrap_or_else(|| format!("{}-{}", profile.id, i));

        out.push(NormalizedEvent {
            id,
            date,
            category: resolve::string_at(obj, &resolved, "category"),
            value,
            detected,
            region,
            source: profile.source.to_string(),
        });
    }

    out
}

fn year_month_date(
    obj: &RawRecord,
    resolved: &std::collections::HashMap<&'static str, String>,
) -> Option<chrono::NaiveDate> {
    let year: i32 = resolve::string_at(obj, resolved, "year")?.parse().ok()?;
    let month: u32 = resolve::string_at(obj, resolved, "month")?.parse().ok()?;
    chrono::NaiveDate::from_ymd_opt(year, month, 1)
}
