use chrono::{DateTime, Duration, Utc};

/// 时间解析工具（创建链接时的 expires_at / reveal_at 输入）
pub struct TimeParser;

impl TimeParser {
    /// 解析时间字符串，支持多种格式：
    /// - RFC3339 格式：2026-10-01T12:00:00Z
    /// - 相对时间（相对于 `now`）：30m, 1d, 2w, 1y
    /// - 组合格式：1d2h30m
    pub fn parse_instant(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, String> {
        let input = input.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(dt.with_timezone(&Utc));
        }

        let offset = Self::parse_relative(input)?;
        now.checked_add_signed(offset)
            .ok_or_else(|| format!("Time '{}' is out of range", input))
    }

    fn parse_relative(input: &str) -> Result<Duration, String> {
        if input.is_empty() {
            return Err("Time value cannot be empty".to_string());
        }

        let mut total = Duration::zero();
        let mut rest = input;

        while !rest.is_empty() {
            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits == 0 {
                return Err(format!("Invalid time format: '{}'", input));
            }
            let num: i64 = rest[..digits]
                .parse()
                .map_err(|_| format!("Invalid number in '{}'", input))?;
            rest = &rest[digits..];

            let unit_len = rest
                .bytes()
                .take_while(u8::is_ascii_alphabetic)
                .count();
            if unit_len == 0 {
                return Err(format!("Missing time unit after '{}'", num));
            }
            let unit = &rest[..unit_len];
            rest = &rest[unit_len..];

            // 大写 M 表示月，其余单位大小写不敏感
            let part = match unit {
                "M" => Duration::try_days(num.saturating_mul(30)),
                _ => match unit.to_ascii_lowercase().as_str() {
                    "s" | "sec" | "second" | "seconds" => Duration::try_seconds(num),
                    "m" | "min" | "minute" | "minutes" => Duration::try_minutes(num),
                    "h" | "hour" | "hours" => Duration::try_hours(num),
                    "d" | "day" | "days" => Duration::try_days(num),
                    "w" | "week" | "weeks" => Duration::try_weeks(num),
                    "month" | "months" => Duration::try_days(num.saturating_mul(30)),
                    "y" | "year" | "years" => Duration::try_days(num.saturating_mul(365)),
                    _ => return Err(format!("Unsupported time unit: '{}'", unit)),
                },
            }
            .ok_or_else(|| format!("Time '{}' is out of range", input))?;

            total = total
                .checked_add(&part)
                .ok_or_else(|| format!("Time '{}' is out of range", input))?;
        }

        if total == Duration::zero() {
            return Err("Time offset cannot be zero".to_string());
        }

        Ok(total)
    }

    /// 格式化剩余时间为人类可读的字符串
    pub fn format_remaining(from: DateTime<Utc>, to: DateTime<Utc>) -> String {
        let secs = to.signed_duration_since(from).num_seconds();
        if secs <= 0 {
            return "now".to_string();
        }

        let days = secs / 86400;
        let hours = (secs % 86400) / 3600;
        let minutes = (secs % 3600) / 60;

        match (days, hours, minutes) {
            (d, h, _) if d > 0 && h > 0 => format!("{}d {}h", d, h),
            (d, _, _) if d > 0 => format!("{}d", d),
            (_, h, m) if h > 0 && m > 0 => format!("{}h {}m", h, m),
            (_, h, _) if h > 0 => format!("{}h", h),
            (_, _, m) if m > 0 => format!("{}m", m),
            _ => format!("{}s", secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_relative_time() {
        let now = fixed_now();

        let result = TimeParser::parse_instant("1d", now).unwrap();
        assert_eq!(result - now, Duration::days(1));

        let result = TimeParser::parse_instant("2w", now).unwrap();
        assert_eq!(result - now, Duration::days(14));

        let result = TimeParser::parse_instant("1M", now).unwrap();
        assert_eq!(result - now, Duration::days(30));

        let result = TimeParser::parse_instant("1d2h30m", now).unwrap();
        assert_eq!((result - now).num_seconds(), 24 * 3600 + 2 * 3600 + 30 * 60);
    }

    #[test]
    fn test_parse_rfc3339() {
        let result = TimeParser::parse_instant("2026-10-01T12:00:00+02:00", fixed_now()).unwrap();
        assert_eq!(result, Utc.with_ymd_and_hms(2026, 10, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_invalid_format() {
        let now = fixed_now();
        assert!(TimeParser::parse_instant("invalid", now).is_err());
        assert!(TimeParser::parse_instant("1x", now).is_err());
        assert!(TimeParser::parse_instant("5", now).is_err());
        assert!(TimeParser::parse_instant("0d", now).is_err());
        assert!(TimeParser::parse_instant("", now).is_err());
    }

    #[test]
    fn test_format_remaining() {
        let now = fixed_now();
        assert_eq!(
            TimeParser::format_remaining(now, now + Duration::hours(26)),
            "1d 2h"
        );
        assert_eq!(
            TimeParser::format_remaining(now, now + Duration::minutes(90)),
            "1h 30m"
        );
        assert_eq!(TimeParser::format_remaining(now, now - Duration::hours(1)), "now");
    }
}
