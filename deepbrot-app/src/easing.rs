use serde::{Deserialize, Serialize};

/// Easing curves mapping linear progress in `[0, 1]` onto eased progress.
///
/// Every curve fixes both endpoints: `apply(0) == 0` and `apply(1) == 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    QuadInOut,
    CubicInOut,
    #[default]
    QuinticInOut,
    SineInOut,
}

impl Easing {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::QuadInOut => in_out(t, 2),
            Self::CubicInOut => in_out(t, 3),
            Self::QuinticInOut => in_out(t, 5),
            Self::SineInOut => -((std::f64::consts::PI * t).cos() - 1.0) / 2.0,
        }
    }
}

/// Polynomial in-out of degree `n`: `2^(n-1)·tⁿ` on the first half,
/// mirrored on the second.
#[inline]
fn in_out(t: f64, n: i32) -> f64 {
    if t < 0.5 {
        2f64.powi(n - 1) * t.powi(n)
    } else {
        1.0 - (-2.0 * t + 2.0).powi(n) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 5] = [
        Easing::Linear,
        Easing::QuadInOut,
        Easing::CubicInOut,
        Easing::QuinticInOut,
        Easing::SineInOut,
    ];

    #[test]
    fn endpoints_are_fixed() {
        for e in ALL {
            assert_eq!(e.apply(0.0), 0.0, "{e:?}");
            assert!((e.apply(1.0) - 1.0).abs() < 1e-15, "{e:?}");
        }
    }

    #[test]
    fn midpoint_is_half() {
        for e in ALL {
            assert!((e.apply(0.5) - 0.5).abs() < 1e-12, "{e:?}");
        }
    }

    #[test]
    fn monotonic() {
        for e in ALL {
            let mut prev = 0.0;
            for i in 1..=100 {
                let v = e.apply(f64::from(i) / 100.0);
                assert!(v >= prev, "{e:?} decreases at {i}");
                prev = v;
            }
        }
    }

    #[test]
    fn out_of_range_is_clamped() {
        assert_eq!(Easing::CubicInOut.apply(-1.0), 0.0);
        assert!((Easing::CubicInOut.apply(2.0) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn quintic_is_flat_at_the_ends() {
        assert!(Easing::QuinticInOut.apply(0.1) < Easing::CubicInOut.apply(0.1));
        assert!((Easing::QuinticInOut.apply(0.25) - 16.0 * 0.25f64.powi(5)).abs() < 1e-15);
    }

    #[test]
    fn serde_names() {
        assert_eq!(serde_json::to_string(&Easing::SineInOut).unwrap(), r#""sine_in_out""#);
        let e: Easing = serde_json::from_str(r#""quad_in_out""#).unwrap();
        assert_eq!(e, Easing::QuadInOut);
    }
}
