//! Intent Matcher
//!
//! Maps a free-text analytics question onto one SQL template over the fixed
//! table. Rules are tried in a fixed order and the first match wins, so more
//! specific rules (name filters with an optional limit) sit ahead of general
//! ones (a bare "first N users" limit). A question nothing matches falls back
//! to a plain row count.
//!
//! Captured values are restricted by their patterns (digits, ASCII letters,
//! domain characters) and string literals are rendered through
//! [`quote_literal`], so a capture can never close its literal.

use crate::sql::{quote_literal, SqlStatement, TABLE};
use regex::Regex;

lazy_static::lazy_static! {
    static ref TIME_WINDOW: Regex =
        Regex::new(r"last\s+([0-9]{1,3})\s+(hour|hours|day|days)").expect("time window pattern");
    static ref ROW_LIMIT: Regex =
        Regex::new(r"(first|top|show)\s+([0-9]{1,3})\s+(users|user|rows|records)").expect("row limit pattern");
    static ref NAME_STARTS: Regex =
        Regex::new(r"name\s+(starts|starting|begins)\s+with\s+([a-z])").expect("name prefix pattern");
    static ref NAME_CONTAINS: Regex =
        Regex::new(r"name\s+contains\s+([a-z0-9]+)").expect("name substring pattern");
    static ref NAME_ENDS: Regex =
        Regex::new(r"name\s+ends\s+with\s+([a-z]+)").expect("name suffix pattern");
    static ref COUNTRY: Regex =
        Regex::new(r"(users|user).*\b(from|in)\s+([a-z]{2})\b").expect("country pattern");
    static ref PLAN: Regex =
        Regex::new(r"(subscription\s+plan|plan)(\s+(is|=))?\s+([a-z]+)").expect("plan pattern");
    static ref EMAIL_DOMAIN: Regex =
        Regex::new(r"email(s)?\s+(with|having)?\s*domain\s+([a-z0-9\.-]+)").expect("email domain pattern");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Hours,
    Days,
}

/// "last N hours/days"; `amount` keeps the digits exactly as the user typed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub amount: String,
    pub unit: TimeUnit,
}

impl TimeWindow {
    fn to_clause(&self) -> String {
        let func = match self.unit {
            TimeUnit::Hours => "subtractHours",
            TimeUnit::Days => "subtractDays",
        };
        format!("signup_date >= {}(now(), {})", func, self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePattern {
    /// Uppercased single letter.
    StartsWith(char),
    Contains(String),
    EndsWith(String),
}

impl NamePattern {
    fn to_like(&self) -> String {
        match self {
            NamePattern::StartsWith(letter) => format!("{}%", letter),
            NamePattern::Contains(part) => format!("%{}%", part),
            NamePattern::EndsWith(suffix) => format!("%{}", suffix),
        }
    }
}

/// A recognised question shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    CountRows,
    AverageAge,
    SumBalance { window: Option<TimeWindow> },
    CountActive,
    CountPerCountry,
    NameFilter { pattern: NamePattern, limit: Option<String> },
    Country(String),
    Plan(String),
    EmailDomain(String),
    Limit(String),
    RecentSignups,
    AverageBalancePerPlan,
    Fallback,
}

impl Intent {
    /// Stable rule name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Intent::CountRows => "count_rows",
            Intent::AverageAge => "average_age",
            Intent::SumBalance { .. } => "sum_balance",
            Intent::CountActive => "count_active",
            Intent::CountPerCountry => "count_per_country",
            Intent::NameFilter { pattern: NamePattern::StartsWith(_), .. } => "name_starts_with",
            Intent::NameFilter { pattern: NamePattern::Contains(_), .. } => "name_contains",
            Intent::NameFilter { pattern: NamePattern::EndsWith(_), .. } => "name_ends_with",
            Intent::Country(_) => "country",
            Intent::Plan(_) => "subscription_plan",
            Intent::EmailDomain(_) => "email_domain",
            Intent::Limit(_) => "limit",
            Intent::RecentSignups => "recent_signups",
            Intent::AverageBalancePerPlan => "average_balance_per_plan",
            Intent::Fallback => "fallback",
        }
    }

    pub fn to_sql(&self) -> SqlStatement {
        let sql = match self {
            Intent::CountRows | Intent::Fallback => format!("SELECT count(*) FROM {}", TABLE),
            Intent::AverageAge => format!("SELECT avg(age) FROM {}", TABLE),
            Intent::SumBalance { window: None } => format!("SELECT sum(balance) FROM {}", TABLE),
            Intent::SumBalance { window: Some(window) } => format!(
                "SELECT sum(balance) FROM {} WHERE {}",
                TABLE,
                window.to_clause()
            ),
            Intent::CountActive => format!("SELECT count(*) FROM {} WHERE is_active = true", TABLE),
            Intent::CountPerCountry => format!(
                "SELECT country, count(*) AS cnt FROM {} GROUP BY country ORDER BY cnt DESC",
                TABLE
            ),
            Intent::NameFilter { pattern, limit } => {
                let base = format!(
                    "SELECT * FROM {} WHERE name ILIKE {}",
                    TABLE,
                    quote_literal(&pattern.to_like())
                );
                match limit {
                    Some(n) => format!("{} LIMIT {}", base, n),
                    None => base,
                }
            }
            Intent::Country(code) => format!(
                "SELECT * FROM {} WHERE country = {}",
                TABLE,
                quote_literal(code)
            ),
            Intent::Plan(plan) => format!(
                "SELECT * FROM {} WHERE subscription_plane = {}",
                TABLE,
                quote_literal(plan)
            ),
            Intent::EmailDomain(domain) => format!(
                "SELECT * FROM {} WHERE email ILIKE {}",
                TABLE,
                quote_literal(&format!("%@{}", domain))
            ),
            Intent::Limit(n) => format!("SELECT * FROM {} LIMIT {}", TABLE, n),
            Intent::RecentSignups => format!(
                "SELECT count(*) FROM {} WHERE signup_date >= subtractDays(now(), 7)",
                TABLE
            ),
            Intent::AverageBalancePerPlan => format!(
                "SELECT subscription_plane, avg(balance) AS avg_balance FROM {} GROUP BY subscription_plane ORDER BY avg_balance DESC",
                TABLE
            ),
        };
        SqlStatement::new(sql)
    }
}

/// One entry of the ordered rule list. `matcher` receives the lowercased question.
pub struct Rule {
    pub name: &'static str,
    pub matcher: fn(&str) -> Option<Intent>,
}

/// Priority order matters: earlier rules shadow later ones.
pub const RULES: &[Rule] = &[
    Rule { name: "count_rows", matcher: match_count_rows },
    Rule { name: "average_age", matcher: match_average_age },
    Rule { name: "sum_balance", matcher: match_sum_balance },
    Rule { name: "count_active", matcher: match_count_active },
    Rule { name: "count_per_country", matcher: match_count_per_country },
    Rule { name: "name_starts_with", matcher: match_name_starts_with },
    Rule { name: "name_contains", matcher: match_name_contains },
    Rule { name: "name_ends_with", matcher: match_name_ends_with },
    Rule { name: "country", matcher: match_country },
    Rule { name: "subscription_plan", matcher: match_plan },
    Rule { name: "email_domain", matcher: match_email_domain },
    Rule { name: "limit", matcher: match_limit },
    Rule { name: "recent_signups", matcher: match_recent_signups },
    Rule { name: "average_balance_per_plan", matcher: match_average_balance_per_plan },
];

/// Classify a question; never fails.
pub fn classify(question: &str) -> Intent {
    let q = question.to_lowercase();
    RULES
        .iter()
        .find_map(|rule| (rule.matcher)(&q))
        .unwrap_or(Intent::Fallback)
}

/// Heuristic translation: classify and render.
pub fn translate(question: &str) -> SqlStatement {
    classify(question).to_sql()
}

fn contains_any(q: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| q.contains(n))
}

fn row_limit(q: &str) -> Option<String> {
    ROW_LIMIT.captures(q).map(|c| c[2].to_string())
}

fn match_count_rows(q: &str) -> Option<Intent> {
    (contains_any(q, &["count", "how many"]) && contains_any(q, &["user", "record", "rows", "entries"]))
        .then_some(Intent::CountRows)
}

fn match_average_age(q: &str) -> Option<Intent> {
    (contains_any(q, &["average", "avg"]) && q.contains("age")).then_some(Intent::AverageAge)
}

fn match_sum_balance(q: &str) -> Option<Intent> {
    if !(contains_any(q, &["sum", "total"]) && q.contains("balance")) {
        return None;
    }
    let window = TIME_WINDOW.captures(q).map(|c| TimeWindow {
        amount: c[1].to_string(),
        unit: if c[2].starts_with("hour") { TimeUnit::Hours } else { TimeUnit::Days },
    });
    Some(Intent::SumBalance { window })
}

fn match_count_active(q: &str) -> Option<Intent> {
    (q.contains("active") && q.contains("user")).then_some(Intent::CountActive)
}

fn match_count_per_country(q: &str) -> Option<Intent> {
    (contains_any(q, &["count", "number"]) && q.contains("country") && contains_any(q, &["per", "by"]))
        .then_some(Intent::CountPerCountry)
}

fn match_name_starts_with(q: &str) -> Option<Intent> {
    let caps = NAME_STARTS.captures(q)?;
    let letter = caps[2].chars().next()?.to_ascii_uppercase();
    Some(Intent::NameFilter {
        pattern: NamePattern::StartsWith(letter),
        limit: row_limit(q),
    })
}

fn match_name_contains(q: &str) -> Option<Intent> {
    let caps = NAME_CONTAINS.captures(q)?;
    Some(Intent::NameFilter {
        pattern: NamePattern::Contains(caps[1].to_string()),
        limit: row_limit(q),
    })
}

fn match_name_ends_with(q: &str) -> Option<Intent> {
    let caps = NAME_ENDS.captures(q)?;
    Some(Intent::NameFilter {
        pattern: NamePattern::EndsWith(caps[1].to_string()),
        limit: row_limit(q),
    })
}

fn match_country(q: &str) -> Option<Intent> {
    COUNTRY
        .captures(q)
        .map(|c| Intent::Country(c[3].to_ascii_uppercase()))
}

fn match_plan(q: &str) -> Option<Intent> {
    PLAN.captures(q).map(|c| Intent::Plan(c[4].to_string()))
}

fn match_email_domain(q: &str) -> Option<Intent> {
    EMAIL_DOMAIN
        .captures(q)
        .map(|c| Intent::EmailDomain(c[3].to_string()))
}

fn match_limit(q: &str) -> Option<Intent> {
    row_limit(q).map(Intent::Limit)
}

fn match_recent_signups(q: &str) -> Option<Intent> {
    (contains_any(q, &["recent", "last week"]) && contains_any(q, &["signup", "sign ups", "signups"]))
        .then_some(Intent::RecentSignups)
}

fn match_average_balance_per_plan(q: &str) -> Option<Intent> {
    (contains_any(q, &["average", "avg"]) && q.contains("balance") && contains_any(q, &["plan", "subscription"]))
        .then_some(Intent::AverageBalancePerPlan)
}
