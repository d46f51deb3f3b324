//! Resolution of relative and absolute review dates.
//!
//! Recognized forms, in priority order within each locale:
//! same day, two days back, previous day, `N days ago`, `N months ago` (30 days each),
//! `N years ago` (365 days each), then `<day> <month> [year]`.
//! A missing count ("a month ago", "месяц назад") means one.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use regex::Regex;
use tracing::{debug, warn};

use crate::app::Result;

const DAYS_PER_MONTH: i64 = 30;
const DAYS_PER_YEAR: i64 = 365;

/// Locale table of date markers and month names.
#[derive(Debug, Clone)]
pub struct DateLocale {
    pub name: &'static str,
    pub today: &'static [&'static str],
    pub day_before_yesterday: &'static [&'static str],
    pub yesterday: &'static [&'static str],
    pub days_ago: &'static str,
    pub months_ago: &'static str,
    pub years_ago: &'static str,
    pub month_names: &'static [(&'static str, u32)],
}

impl DateLocale {
    pub fn russian() -> Self {
        Self {
            name: "ru",
            today: &["сегодня"],
            day_before_yesterday: &["позавчера"],
            yesterday: &["вчера"],
            days_ago: r"(?i)(?:(\d+)\s*)?(?:дней|дня|день)\s+назад",
            months_ago: r"(?i)(?:(\d+)\s*)?(?:месяцев|месяца|месяц)\s+назад",
            years_ago: r"(?i)(?:(\d+)\s*)?(?:лет|года|год)\s+назад",
            month_names: &[
                ("января", 1),
                ("февраля", 2),
                ("марта", 3),
                ("апреля", 4),
                ("мая", 5),
                ("июня", 6),
                ("июля", 7),
                ("августа", 8),
                ("сентября", 9),
                ("октября", 10),
                ("ноября", 11),
                ("декабря", 12),
            ],
        }
    }

    pub fn english() -> Self {
        Self {
            name: "en",
            today: &["today"],
            day_before_yesterday: &["day before yesterday"],
            yesterday: &["yesterday"],
            days_ago: r"(?i)\b(?:(\d+)|an?|one)?\s*days?\s+ago\b",
            months_ago: r"(?i)\b(?:(\d+)|an?|one)?\s*months?\s+ago\b",
            years_ago: r"(?i)\b(?:(\d+)|an?|one)?\s*years?\s+ago\b",
            month_names: &[
                ("january", 1),
                ("february", 2),
                ("march", 3),
                ("april", 4),
                ("may", 5),
                ("june", 6),
                ("july", 7),
                ("august", 8),
                ("september", 9),
                ("october", 10),
                ("november", 11),
                ("december", 12),
            ],
        }
    }
}

struct CompiledLocale {
    locale: DateLocale,
    today: Regex,
    day_before_yesterday: Regex,
    yesterday: Regex,
    days_ago: Regex,
    months_ago: Regex,
    years_ago: Regex,
    absolute: Regex,
}

impl CompiledLocale {
    fn compile(locale: DateLocale) -> Result<Self> {
        let names = locale
            .month_names
            .iter()
            .map(|(name, _)| regex::escape(name))
            .collect::<Vec<_>>()
            .join("|");
        let absolute = Regex::new(&format!(r"(?i)(\d{{1,2}})\s+({})\b(?:\s+(\d{{4}}))?", names))?;

        Ok(Self {
            today: word_pattern(locale.today)?,
            day_before_yesterday: word_pattern(locale.day_before_yesterday)?,
            yesterday: word_pattern(locale.yesterday)?,
            days_ago: Regex::new(locale.days_ago)?,
            months_ago: Regex::new(locale.months_ago)?,
            years_ago: Regex::new(locale.years_ago)?,
            absolute,
            locale,
        })
    }

    fn resolve(&self, expression: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.today.is_match(expression) {
            return Some(now);
        }
        if self.day_before_yesterday.is_match(expression) {
            return days_before(now, 2);
        }
        if self.yesterday.is_match(expression) {
            return days_before(now, 1);
        }
        if let Some(n) = relative_count(&self.days_ago, expression) {
            return days_before(now, n);
        }
        if let Some(n) = relative_count(&self.months_ago, expression) {
            return days_before(now, n.checked_mul(DAYS_PER_MONTH)?);
        }
        if let Some(n) = relative_count(&self.years_ago, expression) {
            return days_before(now, n.checked_mul(DAYS_PER_YEAR)?);
        }
        self.absolute_date(expression, now)
    }

    fn absolute_date(&self, expression: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let caps = self.absolute.captures(expression)?;
        let day: u32 = caps.get(1)?.as_str().parse().ok()?;
        let name = caps.get(2)?.as_str().to_lowercase();
        let month = self
            .locale
            .month_names
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, number)| *number)?;
        let year = match caps.get(3) {
            Some(y) => y.as_str().parse().ok()?,
            None => now.year(),
        };

        NaiveDate::from_ymd_opt(year, month, day)?
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
    }
}

/// Case-insensitive whole-word match of any marker.
fn word_pattern(markers: &[&str]) -> Result<Regex> {
    let alternatives = markers
        .iter()
        .map(|m| regex::escape(m))
        .collect::<Vec<_>>()
        .join("|");
    Ok(Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives))?)
}

/// Count captured by a relative pattern; `Some(1)` when the count is implied.
fn relative_count(pattern: &Regex, expression: &str) -> Option<i64> {
    let caps = pattern.captures(expression)?;
    match caps.get(1) {
        Some(n) => n.as_str().parse().ok(),
        None => Some(1),
    }
}

fn days_before(now: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(Duration::try_days(days)?)
}

/// Non-fatal marker for a date expression nothing recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParseWarning {
    pub expression: String,
}

/// Outcome of [`DateResolver::resolve`]: always a timestamp, maybe a warning.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub at: DateTime<Utc>,
    pub warning: Option<DateParseWarning>,
}

pub struct DateResolver {
    locales: Vec<CompiledLocale>,
}

impl DateResolver {
    pub fn new(locales: Vec<DateLocale>) -> Result<Self> {
        let locales = locales
            .into_iter()
            .map(CompiledLocale::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { locales })
    }

    /// Russian first, then English.
    pub fn with_default_locales() -> Result<Self> {
        Self::new(vec![DateLocale::russian(), DateLocale::english()])
    }

    /// Strict resolution: `None` when no locale recognizes the expression.
    pub fn try_resolve(&self, expression: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let expression = expression.trim();
        self.locales.iter().find_map(|locale| {
            let at = locale.resolve(expression, now)?;
            debug!("Resolved {:?} with the {} locale", expression, locale.locale.name);
            Some(at)
        })
    }

    /// Lenient resolution falling back to `now` with a [`DateParseWarning`].
    pub fn resolve(&self, expression: &str, now: DateTime<Utc>) -> Resolution {
        match self.try_resolve(expression, now) {
            Some(at) => Resolution { at, warning: None },
            None => {
                warn!("Could not parse review date: {:?}", expression);
                Resolution {
                    at: now,
                    warning: Some(DateParseWarning {
                        expression: expression.trim().to_string(),
                    }),
                }
            }
        }
    }
}
