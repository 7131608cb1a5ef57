// ==========================================
// MRP 订单系统 - 数量运算
// ==========================================
// 约定: 数量写库前舍入到 5 位小数，比较容差 1e-9
// ==========================================

/// 数量小数位数
pub const QTY_DECIMALS: i32 = 5;

/// 比较容差
pub const QTY_EPSILON: f64 = 1e-9;

/// 舍入到 5 位小数
pub fn round_qty(q: f64) -> f64 {
    let factor = 10f64.powi(QTY_DECIMALS);
    let rounded = (q * factor).round() / factor;
    // 避免 -0.0
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

pub fn qty_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= QTY_EPSILON
}

/// a > b（超出容差）
pub fn qty_gt(a: f64, b: f64) -> bool {
    a - b > QTY_EPSILON
}

/// a >= b（容差内视为相等）
pub fn qty_ge(a: f64, b: f64) -> bool {
    a - b >= -QTY_EPSILON
}

pub fn qty_lt(a: f64, b: f64) -> bool {
    !qty_ge(a, b)
}

pub fn is_positive(q: f64) -> bool {
    qty_gt(q, 0.0)
}

pub fn is_integer_qty(q: f64) -> bool {
    (q - q.round()).abs() <= QTY_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_qty_five_places() {
        assert_eq!(round_qty(1.234567), 1.23457);
        assert_eq!(round_qty(0.1 + 0.2), 0.3);
        assert_eq!(round_qty(-0.000001), 0.0);
    }

    #[test]
    fn test_tolerant_comparisons() {
        assert!(qty_eq(0.1 + 0.2, 0.3));
        assert!(!qty_gt(0.1 + 0.2, 0.3));
        assert!(qty_ge(0.3, 0.1 + 0.2));
        assert!(qty_lt(2.0, 3.0));
        assert!(!is_positive(0.0));
        assert!(is_positive(0.00001));
    }

    #[test]
    fn test_integer_quantity() {
        assert!(is_integer_qty(5.0));
        assert!(is_integer_qty(2.9999999999));
        assert!(!is_integer_qty(2.5));
    }
}
