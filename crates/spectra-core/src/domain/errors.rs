use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SpectraResult<T> = Result<T, SpectraError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpectraErrorCategory {
    Configuration,
    Derivation,
    Saturation,
    Consistency,
    IoSystem,
}

impl SpectraErrorCategory {
    pub const fn exit_descriptor(self) -> ExitDescriptor {
        match self {
            Self::Configuration => ExitDescriptor {
                exit_code: 2,
                label: "ConfigurationError",
                class: "CONFIG_FATAL",
            },
            Self::IoSystem => ExitDescriptor {
                exit_code: 3,
                label: "IoSystemError",
                class: "IO_FATAL",
            },
            Self::Derivation => ExitDescriptor {
                exit_code: 4,
                label: "DerivationError",
                class: "DERIVATION_FATAL",
            },
            Self::Saturation => ExitDescriptor {
                exit_code: 5,
                label: "SaturationError",
                class: "SATURATION_FATAL",
            },
            Self::Consistency => ExitDescriptor {
                exit_code: 6,
                label: "ConsistencyError",
                class: "INTERNAL_FATAL",
            },
        }
    }

    pub const fn exit_code(self) -> i32 {
        self.exit_descriptor().exit_code
    }

    pub const fn label(self) -> &'static str {
        self.exit_descriptor().label
    }

    pub const fn class(self) -> &'static str {
        self.exit_descriptor().class
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitDescriptor {
    pub exit_code: i32,
    pub label: &'static str,
    pub class: &'static str,
}

/// Error raised by the recomputation engine and its collaborators.
///
/// `placeholder` is a stable dotted code (`RESCALE.SATURATED_TRANSMITTANCE`)
/// that tests and the CLI can match on without parsing the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpectraError {
    category: SpectraErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl SpectraError {
    pub fn new(
        category: SpectraErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn configuration(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SpectraErrorCategory::Configuration, placeholder, message)
    }

    pub fn derivation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SpectraErrorCategory::Derivation, placeholder, message)
    }

    pub fn saturation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SpectraErrorCategory::Saturation, placeholder, message)
    }

    pub fn consistency(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SpectraErrorCategory::Consistency, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SpectraErrorCategory::IoSystem, placeholder, message)
    }

    pub const fn category(&self) -> SpectraErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!(
            "FATAL EXIT CODE: {} ({})",
            self.exit_code(),
            self.category.class()
        )
    }
}

impl Display for SpectraError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.label(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for SpectraError {}
