use anyhow::{Context, Result, bail};
use studyplan_core::StrategyId;

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Expand a strategy list; `all` selects every built-in strategy.
pub fn parse_strategies(arg: &str) -> Result<Vec<StrategyId>> {
    let mut strategies = Vec::new();
    for token in split_csv(arg) {
        if token.eq_ignore_ascii_case("all") {
            for strategy in StrategyId::ALL {
                if !strategies.contains(&strategy) {
                    strategies.push(strategy);
                }
            }
            continue;
        }
        let strategy = token
            .parse::<StrategyId>()
            .with_context(|| format!("invalid --strategies entry `{token}`"))?;
        if !strategies.contains(&strategy) {
            strategies.push(strategy);
        }
    }
    if strategies.is_empty() {
        bail!("no strategies selected");
    }
    Ok(strategies)
}

/// Parse horizons in semesters; negative values are rejected.
pub fn parse_horizons(arg: &str) -> Result<Vec<u32>> {
    split_csv(arg)
        .iter()
        .map(|token| {
            let value: i64 = token
                .parse()
                .with_context(|| format!("horizon `{token}` is not a number"))?;
            if value < 0 {
                bail!("horizon must not be negative (got {value})");
            }
            u32::try_from(value).with_context(|| format!("horizon `{token}` is too large"))
        })
        .collect()
}

pub fn parse_seeds(arg: &str) -> Result<Vec<u64>> {
    let seeds = split_csv(arg)
        .iter()
        .map(|token| {
            let parsed = match token.strip_prefix("0x") {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => token.parse::<u64>(),
            };
            parsed.with_context(|| format!("unrecognized seed token: {token}"))
        })
        .collect::<Result<Vec<_>>>()?;
    if seeds.is_empty() {
        return Ok(vec![1337]);
    }
    Ok(seeds)
}

pub mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}
