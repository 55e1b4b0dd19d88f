#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArrayDataType {
    Uint8,
    Uint16,
    Uint32,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl ArrayDataType {
    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "byte" | "uint8" => Some(Self::Uint8),
            "uint16" => Some(Self::Uint16),
            "uint32" => Some(Self::Uint32),
            "int16" => Some(Self::Int16),
            "int" | "int32" => Some(Self::Int32),
            "int64" => Some(Self::Int64),
            "float" | "float32" => Some(Self::Float32),
            "double" | "float64" => Some(Self::Float64),
            _ => None,
        }
    }

    pub fn is_floating_point(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    pub fn is_signed(self) -> bool {
        !matches!(self, Self::Uint8 | Self::Uint16 | Self::Uint32)
    }

    /// Width of the type in bytes.
    pub fn size_in_bytes(self) -> usize {
        match self {
            Self::Uint8 => 1,
            Self::Uint16 | Self::Int16 => 2,
            Self::Uint32 | Self::Int32 | Self::Float32 => 4,
            Self::Int64 | Self::Float64 => 8,
        }
    }

    /// The nodata sentinel used when a nodata value cannot be represented in
    /// this type: the maximum value for integral types, NaN for floating point.
    pub fn default_nodata_value(self) -> f64 {
        match self {
            Self::Uint8 => f64::from(u8::MAX),
            Self::Uint16 => f64::from(u16::MAX),
            Self::Uint32 => f64::from(u32::MAX),
            Self::Int16 => f64::from(i16::MAX),
            Self::Int32 => f64::from(i32::MAX),
            Self::Int64 => i64::MAX as f64,
            Self::Float32 | Self::Float64 => f64::NAN,
        }
    }

    /// Result type selection for element wise arithmetic between two rasters.
    /// The widest input type wins. Mixed signedness at equal width promotes to
    /// the signed type one width up so both inputs stay representable.
    pub fn promote(lhs: ArrayDataType, rhs: ArrayDataType) -> ArrayDataType {
        use ArrayDataType::*;

        if lhs == rhs {
            return lhs;
        }

        if lhs == Float64 || rhs == Float64 {
            return Float64;
        }

        if lhs == Float32 || rhs == Float32 {
            let other = if lhs == Float32 { rhs } else { lhs };
            return if other == Int64 { Float64 } else { Float32 };
        }

        let (wide, narrow) = if lhs.size_in_bytes() >= rhs.size_in_bytes() { (lhs, rhs) } else { (rhs, lhs) };
        if wide.size_in_bytes() > narrow.size_in_bytes() {
            if wide.is_signed() || !narrow.is_signed() {
                return wide;
            }

            // unsigned wide with signed narrow, step up to keep negative values representable
            return match wide {
                Uint16 => Int32,
                Uint32 => Int64,
                _ => wide,
            };
        }

        // equal width, mixed signedness
        match wide.size_in_bytes() {
            1 => Int16,
            2 => Int32,
            _ => Int64,
        }
    }

    /// Divisions always produce a floating point result.
    pub fn promote_division(lhs: ArrayDataType, rhs: ArrayDataType) -> ArrayDataType {
        use ArrayDataType::*;

        if (lhs != Float64 && rhs != Float64) && (lhs == Float32 || rhs == Float32) {
            Float32
        } else {
            Float64
        }
    }
}

impl std::fmt::Display for ArrayDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

#[cfg(test)]
mod tests {
    use super::ArrayDataType::*;
    use super::*;

    #[test]
    fn promotion_widest_type_wins() {
        assert_eq!(ArrayDataType::promote(Uint8, Uint8), Uint8);
        assert_eq!(ArrayDataType::promote(Uint8, Int32), Int32);
        assert_eq!(ArrayDataType::promote(Int16, Uint8), Int16);
        assert_eq!(ArrayDataType::promote(Uint32, Int64), Int64);
        assert_eq!(ArrayDataType::promote(Float32, Int32), Float32);
        assert_eq!(ArrayDataType::promote(Float32, Int64), Float64);
        assert_eq!(ArrayDataType::promote(Float64, Uint8), Float64);
    }

    #[test]
    fn promotion_mixed_signedness() {
        assert_eq!(ArrayDataType::promote(Uint32, Int32), Int64);
        assert_eq!(ArrayDataType::promote(Uint16, Int16), Int32);
        assert_eq!(ArrayDataType::promote(Uint32, Int16), Int64);
        assert_eq!(ArrayDataType::promote(Uint16, Int32), Int32);
    }

    #[test]
    fn promotion_division_is_floating_point() {
        assert_eq!(ArrayDataType::promote_division(Int32, Int32), Float64);
        assert_eq!(ArrayDataType::promote_division(Float32, Int32), Float32);
        assert_eq!(ArrayDataType::promote_division(Float32, Float64), Float64);
        assert_eq!(ArrayDataType::promote_division(Uint8, Uint8), Float64);
    }
}
