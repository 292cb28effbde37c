/// What went wrong, at the granularity an orchestrating layer cares about.
///
/// The first three are generic (bad input, no data, numeric failure); the rest
/// name the specific recoverable failures the fitting pipeline can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid configuration or malformed input file.
    Config,
    /// No usable data for the requested operation.
    Data,
    /// A numeric/fit failure not covered by a more specific kind.
    Fit,
    /// Plateau/clip saturation collapsed the regression target to near-constant.
    DegenerateFitInput,
    /// A recovered rate constant k <= 0, invalid for the log transform.
    NonPositiveRateConstant,
    /// Fewer than 2 usable (T, k) pairs for an Arrhenius regression.
    InsufficientPoints,
    /// A condition key missing the expected replicate count.
    MalformedCondition,
}

impl ErrorKind {
    fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Config | ErrorKind::MalformedCondition => 2,
            ErrorKind::Data | ErrorKind::InsufficientPoints => 3,
            ErrorKind::Fit | ErrorKind::DegenerateFitInput | ErrorKind::NonPositiveRateConstant => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Data, message)
    }

    pub fn fit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fit, message)
    }

    pub fn degenerate_fit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DegenerateFitInput, message)
    }

    pub fn non_positive_rate(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NonPositiveRateConstant, message)
    }

    pub fn insufficient_points(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InsufficientPoints, message)
    }

    pub fn malformed_condition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedCondition, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_kind() {
        assert_eq!(AppError::config("x").exit_code(), 2);
        assert_eq!(AppError::malformed_condition("x").exit_code(), 2);
        assert_eq!(AppError::insufficient_points("x").exit_code(), 3);
        assert_eq!(AppError::degenerate_fit("x").exit_code(), 4);
        assert_eq!(AppError::non_positive_rate("x").exit_code(), 4);
    }
}
