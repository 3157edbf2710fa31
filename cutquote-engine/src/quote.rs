//! 由长度、空行程与切割速度计算机时与价格。

use crate::errors::ConfigurationError;

/// 空行程速度（m/s）。
pub const RAPID_SPEED_M_PER_S: f64 = 0.25;
/// 穿孔、加减速等附加时间占比。
pub const OVERHEAD_FRACTION: f64 = 0.30;

/// 价格参数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceList {
    pub cost_per_minute: f64,
    pub minimum_price: f64,
}

impl PriceList {
    pub fn new(cost_per_minute: f64, minimum_price: f64) -> Result<Self, ConfigurationError> {
        let valid = |value: f64| value.is_finite() && value >= 0.0;
        if !valid(cost_per_minute) || !valid(minimum_price) {
            return Err(ConfigurationError::InvalidPricing {
                cost_per_minute,
                minimum_price,
            });
        }
        Ok(Self {
            cost_per_minute,
            minimum_price,
        })
    }
}

impl Default for PriceList {
    fn default() -> Self {
        Self {
            cost_per_minute: 5.0,
            minimum_price: 50.0,
        }
    }
}

/// 机时拆分与最终价格。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeAndPrice {
    pub cutting_seconds: f64,
    pub rapid_seconds: f64,
    pub total_seconds: f64,
    pub time_minutes: u64,
    pub price: f64,
}

/// 计算报价。`speed_m_per_s` 必须是正的有限值，否则返回配置错误。
pub fn quote(
    total_length_mm: f64,
    rapid_distance_mm: f64,
    speed_m_per_s: f64,
    prices: PriceList,
) -> Result<TimeAndPrice, ConfigurationError> {
    if !(speed_m_per_s.is_finite() && speed_m_per_s > 0.0) {
        return Err(ConfigurationError::NonPositiveSpeed(speed_m_per_s));
    }

    let cutting_seconds = (total_length_mm / 1000.0) / speed_m_per_s;
    let rapid_seconds = (rapid_distance_mm / 1000.0) / RAPID_SPEED_M_PER_S;
    let total_seconds = (cutting_seconds + rapid_seconds) * (1.0 + OVERHEAD_FRACTION);

    let time_minutes = billable_minutes(total_seconds);
    let price = round_currency(
        (time_minutes as f64 * prices.cost_per_minute).max(prices.minimum_price),
    );

    Ok(TimeAndPrice {
        cutting_seconds,
        rapid_seconds,
        total_seconds,
        time_minutes,
        price,
    })
}

/// 不足一分钟按一分钟计；非正时长为 0。
fn billable_minutes(total_seconds: f64) -> u64 {
    if total_seconds.is_finite() && total_seconds > 0.0 {
        (total_seconds / 60.0).ceil() as u64
    } else {
        0
    }
}

/// 保留两位小数。
#[inline]
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_line_bills_one_minute_at_minimum_price() {
        let result = quote(100.0, 0.0, 0.117, PriceList::default()).unwrap();
        assert!((result.cutting_seconds - 0.8547).abs() < 1e-3);
        assert!((result.total_seconds - 1.111).abs() < 1e-3);
        assert_eq!(result.time_minutes, 1);
        assert_eq!(result.price, 50.0);
    }

    #[test]
    fn long_cut_exceeds_minimum_price() {
        // 10 m @ 0.1 m/s = 100 s，加 1 m 空行程 4 s，×1.3 = 135.2 s → 3 min
        let result = quote(10_000.0, 1_000.0, 0.1, PriceList::new(20.0, 50.0).unwrap()).unwrap();
        assert!((result.total_seconds - 135.2).abs() < 1e-9);
        assert_eq!(result.time_minutes, 3);
        assert_eq!(result.price, 60.0);
    }

    #[test]
    fn zero_length_is_zero_minutes_and_minimum_price() {
        let result = quote(0.0, 0.0, 0.2, PriceList::default()).unwrap();
        assert_eq!(result.time_minutes, 0);
        assert_eq!(result.price, 50.0);
    }

    #[test]
    fn non_positive_speed_is_rejected() {
        for speed in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                quote(100.0, 0.0, speed, PriceList::default()),
                Err(ConfigurationError::NonPositiveSpeed(_))
            ));
        }
    }

    #[test]
    fn price_is_monotonic_in_length() {
        let prices = PriceList::new(5.0, 0.0).unwrap();
        let mut last = 0.0;
        for step in 0..50 {
            let result = quote(step as f64 * 500.0, 0.0, 0.05, prices).unwrap();
            assert!(result.price >= last);
            last = result.price;
        }
    }

    #[test]
    fn negative_pricing_is_rejected() {
        assert!(PriceList::new(-1.0, 50.0).is_err());
        assert!(PriceList::new(5.0, f64::NAN).is_err());
    }

    #[test]
    fn currency_rounds_to_cents() {
        assert_eq!(round_currency(12.345_6), 12.35);
        assert_eq!(round_currency(7.0), 7.0);
    }
}
