use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use vitalsync_types::{
    HydrationValue, LiquidType, Measurement, SleepValue, Tolerance, WeightUnit, WeightValue,
};

fn at(h: u32, m: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, h, m, 0).unwrap()
}

// ── Weight ───────────────────────────────────────────────────────

#[test]
fn weight_delta_same_unit() {
    let a = WeightValue::kilograms(70.0);
    let b = WeightValue::kilograms(70.25);
    assert!((a.value_delta(&b) - 0.25).abs() < 1e-9);
}

#[test]
fn weight_delta_converts_units() {
    let kg = WeightValue::kilograms(45.359237);
    let lb = WeightValue::pounds(100.0);
    assert!(kg.value_delta(&lb) < 1e-9);
    assert!(lb.value_delta(&kg) < 1e-9);
}

#[test]
fn weight_in_unit() {
    let lb = WeightValue::pounds(10.0);
    assert!((lb.in_unit(WeightUnit::Kilograms) - 4.5359237).abs() < 1e-9);
    assert_eq!(lb.in_unit(WeightUnit::Pounds), 10.0);
}

#[test]
fn weight_validation() {
    assert!(WeightValue::kilograms(70.0).validate(at(8, 0)).is_ok());
    assert!(WeightValue::kilograms(0.0).validate(at(8, 0)).is_err());
    assert!(WeightValue::kilograms(f64::NAN).validate(at(8, 0)).is_err());
}

#[test]
fn weight_default_tolerances() {
    let t = WeightValue::default_tolerances();
    assert_eq!(t.strict, Tolerance::new(60, 0.1));
    assert_eq!(t.historical, Tolerance::new(300, 0.2));
}

#[test]
fn weight_unit_defaults_to_kilograms_when_missing() {
    let v: WeightValue = serde_json::from_str(r#"{"magnitude":80.5}"#).unwrap();
    assert_eq!(v.unit, WeightUnit::Kilograms);
}

// ── Sleep ────────────────────────────────────────────────────────

#[test]
fn sleep_delta_in_minutes() {
    let a = SleepValue::new(at(7, 0), None);
    let b = SleepValue::new(at(7, 3), Some(4));
    assert!((a.value_delta(&b) - 3.0).abs() < 1e-9);
}

#[test]
fn sleep_must_end_after_start() {
    let v = SleepValue::new(at(7, 0), None);
    assert!(v.validate(at(6, 0)).is_ok());
    assert!(v.validate(at(7, 0)).is_err());
    assert!(v.validate(at(8, 0)).is_err());
}

#[test]
fn sleep_quality_range() {
    assert!(SleepValue::new(at(7, 0), Some(5)).validate(at(1, 0)).is_ok());
    assert!(SleepValue::new(at(7, 0), Some(0)).validate(at(1, 0)).is_err());
    assert!(SleepValue::new(at(7, 0), Some(6)).validate(at(1, 0)).is_err());
}

// ── Hydration ────────────────────────────────────────────────────

#[test]
fn hydration_delta_and_validation() {
    let a = HydrationValue::water(250.0);
    let b = HydrationValue::new(253.0, LiquidType::Tea);
    assert!((a.value_delta(&b) - 3.0).abs() < 1e-9);
    assert!(a.validate(at(9, 0)).is_ok());
    assert!(HydrationValue::water(-1.0).validate(at(9, 0)).is_err());
}

#[test]
fn tolerance_time_window() {
    assert_eq!(Tolerance::new(60, 0.1).time_window(), Duration::seconds(60));
}

proptest! {
    #[test]
    fn weight_delta_is_symmetric_within_unit(a in 1.0f64..400.0, b in 1.0f64..400.0) {
        let x = WeightValue::kilograms(a);
        let y = WeightValue::kilograms(b);
        prop_assert!((x.value_delta(&y) - y.value_delta(&x)).abs() < 1e-9);
        prop_assert!(x.value_delta(&y) >= 0.0);
    }

    #[test]
    fn weight_delta_to_self_is_zero(a in 1.0f64..400.0, pounds in any::<bool>()) {
        let v = if pounds { WeightValue::pounds(a) } else { WeightValue::kilograms(a) };
        prop_assert!(v.value_delta(&v) < 1e-12);
    }

    #[test]
    fn hydration_delta_is_symmetric(a in 1.0f64..5000.0, b in 1.0f64..5000.0) {
        let x = HydrationValue::water(a);
        let y = HydrationValue::water(b);
        prop_assert_eq!(x.value_delta(&y), y.value_delta(&x));
    }
}
