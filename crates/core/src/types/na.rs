/// Sentinel-based NA encoding for fixed-width elements.
///
/// Integers use the type's minimum, floats use a quiet NaN. Booleans are
/// stored as `i8` and share the integer sentinel.
pub trait Na: Copy {
    const NA: Self;

    fn is_na(&self) -> bool;
}

macro_rules! impl_na_int {
    ($($t:ty),*) => {
        $(impl Na for $t {
            const NA: Self = <$t>::MIN;

            #[inline]
            fn is_na(&self) -> bool {
                *self == <$t>::MIN
            }
        })*
    };
}

impl_na_int!(i8, i16, i32, i64);

impl Na for f32 {
    const NA: Self = f32::NAN;

    #[inline]
    fn is_na(&self) -> bool {
        self.is_nan()
    }
}

impl Na for f64 {
    const NA: Self = f64::NAN;

    #[inline]
    fn is_na(&self) -> bool {
        self.is_nan()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_sentinels() {
        assert!(<i8 as Na>::NA.is_na());
        assert!(<i64 as Na>::NA.is_na());
        assert!(!0i32.is_na());
        assert!(!(i32::MIN + 1).is_na());
    }

    #[test]
    fn float_sentinels() {
        assert!(<f64 as Na>::NA.is_na());
        assert!(!0.0f64.is_na());
        assert!(!f64::INFINITY.is_na());
    }
}
