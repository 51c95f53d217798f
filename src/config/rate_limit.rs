use std::env;
use std::str::FromStr;

/// Token bucket settings for one route group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub per_second: u64,
    pub burst_size: u32,
}

impl RateLimitRule {
    const fn new(per_second: u64, burst_size: u32) -> Self {
        Self {
            per_second,
            burst_size,
        }
    }
}

/// Parses `per_second:burst`, both non-zero.
impl FromStr for RateLimitRule {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (per_second, burst) = raw
            .split_once(':')
            .ok_or_else(|| format!("invalid rule '{}', expected per:burst", raw))?;
        let per_second: u64 = per_second
            .trim()
            .parse()
            .map_err(|_| format!("invalid per_second '{}'", per_second.trim()))?;
        let burst_size: u32 = burst
            .trim()
            .parse()
            .map_err(|_| format!("invalid burst_size '{}'", burst.trim()))?;
        if per_second == 0 || burst_size == 0 {
            return Err(format!("rule '{}' must be non-zero", raw.trim()));
        }
        Ok(Self::new(per_second, burst_size))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitGroup {
    Auth,
    PublicRead,
    Protected,
    /// Claim submission and decision endpoints.
    Claims,
}

impl LimitGroup {
    const ALL: [LimitGroup; 4] = [
        LimitGroup::Auth,
        LimitGroup::PublicRead,
        LimitGroup::Protected,
        LimitGroup::Claims,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "auth" => Some(LimitGroup::Auth),
            "public" | "public_read" => Some(LimitGroup::PublicRead),
            "protected" => Some(LimitGroup::Protected),
            "claims" | "claim" => Some(LimitGroup::Claims),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub enabled: bool,
    rules: [RateLimitRule; 4],
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rules: [
                RateLimitRule::new(5, 10),
                RateLimitRule::new(30, 60),
                RateLimitRule::new(10, 20),
                RateLimitRule::new(2, 5),
            ],
        }
    }
}

impl RateLimitConfig {
    /// Reads `RATE_LIMIT_ENABLED` and `RATE_LIMIT_CONFIG`.
    ///
    /// `RATE_LIMIT_CONFIG` is either one rule for every group (`"10:20"`) or a
    /// comma-separated list such as `"auth=5:10,claims=2:5"`. An invalid value
    /// is logged and the defaults are kept.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(raw) = env::var("RATE_LIMIT_ENABLED") {
            cfg.enabled = parse_switch(&raw).unwrap_or(cfg.enabled);
        }
        if let Ok(raw) = env::var("RATE_LIMIT_CONFIG") {
            if let Err(err) = cfg.apply(&raw) {
                tracing::warn!("Invalid RATE_LIMIT_CONFIG '{}': {}", raw, err);
            }
        }
        cfg
    }

    pub fn rule(&self, group: LimitGroup) -> RateLimitRule {
        self.rules[group.index()]
    }

    /// Apply overrides; on error nothing is changed.
    fn apply(&mut self, raw: &str) -> Result<(), String> {
        let mut rules = self.rules;
        for (group, rule) in parse_overrides(raw)? {
            match group {
                Some(group) => rules[group.index()] = rule,
                None => rules = [rule; 4],
            }
        }
        self.rules = rules;
        Ok(())
    }
}

fn parse_switch(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// `None` as the group means every group.
fn parse_overrides(raw: &str) -> Result<Vec<(Option<LimitGroup>, RateLimitRule)>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("empty value".to_string());
    }
    if !raw.contains('=') {
        return Ok(vec![(None, raw.parse()?)]);
    }

    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, rule) = entry
                .split_once('=')
                .ok_or_else(|| format!("invalid item '{}', expected name=per:burst", entry))?;
            let group = LimitGroup::from_name(name).ok_or_else(|| {
                format!(
                    "unknown group '{}', expected auth/public/protected/claims",
                    name.trim()
                )
            })?;
            Ok((Some(group), rule.trim().parse()?))
        })
        .collect()
}
