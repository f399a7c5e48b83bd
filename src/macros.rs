//===========================================================================//

macro_rules! invalid_data {
    ($e:expr) => {
        return Err($crate::error::DecodeError::Invalid($e.to_string()))
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::error::DecodeError::Invalid(
            format!($fmt, $($arg)+),
        ))
    };
}

//===========================================================================//
