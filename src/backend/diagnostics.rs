//! Diagnostic kinds and rejection causes
//!
//! A rejected call site carries a [`RejectionCause`] describing what went
//! wrong and the [`DiagnosticKind`] it classifies to. The classification is
//! total: every cause maps to exactly one kind, so expectations can be compared
//! exactly.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;

use super::types::TypeExpr;

/// Closed set of diagnostic codes a fixture marker may name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticKind {
    IncompatibleCall,
    IncompatibleType,
    IncompatibleTypeArg,
    IncompatibleUse,
    ExtraArg,
    PropMissing,
    UnsafeAddition,
    NotAFunction,
}

impl DiagnosticKind {
    pub const ALL: [DiagnosticKind; 8] = [
        DiagnosticKind::IncompatibleCall,
        DiagnosticKind::IncompatibleType,
        DiagnosticKind::IncompatibleTypeArg,
        DiagnosticKind::IncompatibleUse,
        DiagnosticKind::ExtraArg,
        DiagnosticKind::PropMissing,
        DiagnosticKind::UnsafeAddition,
        DiagnosticKind::NotAFunction,
    ];

    pub fn code(self) -> &'static str {
        match self {
            DiagnosticKind::IncompatibleCall => "incompatible-call",
            DiagnosticKind::IncompatibleType => "incompatible-type",
            DiagnosticKind::IncompatibleTypeArg => "incompatible-type-arg",
            DiagnosticKind::IncompatibleUse => "incompatible-use",
            DiagnosticKind::ExtraArg => "extra-arg",
            DiagnosticKind::PropMissing => "prop-missing",
            DiagnosticKind::UnsafeAddition => "unsafe-addition",
            DiagnosticKind::NotAFunction => "not-a-function",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when a marker names a kind outside the closed set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown diagnostic kind '{}' (expected one of: {})",
            self.0,
            DiagnosticKind::ALL.iter().map(|k| k.code()).join(", ")
        )
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for DiagnosticKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiagnosticKind::ALL
            .into_iter()
            .find(|k| k.code() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Why an evaluation was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionCause {
    ArityMismatch {
        supplied: usize,
        min: usize,
        /// `None` when a rest parameter lifts the upper bound
        max: Option<usize>,
    },
    IncompatibleArgument {
        position: usize,
        expected: TypeExpr,
        found: TypeExpr,
    },
    TypeArgumentCount {
        supplied: usize,
        expected: usize,
    },
    TypeArgumentBound {
        param: String,
        bound: TypeExpr,
        found: TypeExpr,
    },
    /// Every overload of an overloaded callee failed; causes in overload order
    NoMatchingOverload(Vec<RejectionCause>),
    MissingProperty {
        property: String,
        receiver: TypeExpr,
    },
    NullableAccess {
        property: String,
        receiver: TypeExpr,
    },
    NonNumericOperand {
        left: TypeExpr,
        right: TypeExpr,
    },
    IncompatibleAssignment {
        expected: TypeExpr,
        found: TypeExpr,
        /// Both sides apply the same generic type and differ only in arguments
        in_type_arg: bool,
    },
    NotCallable(TypeExpr),
    NotAComponent(TypeExpr),
}

impl RejectionCause {
    /// Classify the cause into its diagnostic kind
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            RejectionCause::ArityMismatch { supplied, max, .. } => match max {
                Some(max) if supplied > max => DiagnosticKind::ExtraArg,
                _ => DiagnosticKind::IncompatibleCall,
            },
            RejectionCause::IncompatibleArgument { .. }
            | RejectionCause::TypeArgumentCount { .. }
            | RejectionCause::TypeArgumentBound { .. } => DiagnosticKind::IncompatibleCall,
            RejectionCause::NoMatchingOverload(causes) => {
                if !causes.is_empty()
                    && causes.iter().all(|c| c.kind() == DiagnosticKind::ExtraArg)
                {
                    DiagnosticKind::ExtraArg
                } else {
                    DiagnosticKind::IncompatibleCall
                }
            }
            RejectionCause::MissingProperty { .. } => DiagnosticKind::PropMissing,
            RejectionCause::NullableAccess { .. } => DiagnosticKind::IncompatibleUse,
            RejectionCause::NonNumericOperand { .. } => DiagnosticKind::UnsafeAddition,
            RejectionCause::IncompatibleAssignment { in_type_arg, .. } => {
                if *in_type_arg {
                    DiagnosticKind::IncompatibleTypeArg
                } else {
                    DiagnosticKind::IncompatibleType
                }
            }
            RejectionCause::NotCallable(_) => DiagnosticKind::NotAFunction,
            RejectionCause::NotAComponent(_) => DiagnosticKind::IncompatibleType,
        }
    }
}

impl fmt::Display for RejectionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionCause::ArityMismatch { supplied, min, max } => match max {
                Some(max) if min == max => {
                    write!(f, "expected {} argument(s), got {}", min, supplied)
                }
                Some(max) => write!(f, "expected {}..{} arguments, got {}", min, max, supplied),
                None => write!(f, "expected at least {} argument(s), got {}", min, supplied),
            },
            RejectionCause::IncompatibleArgument {
                position,
                expected,
                found,
            } => write!(
                f,
                "argument {}: {} is incompatible with {}",
                position + 1,
                found,
                expected
            ),
            RejectionCause::TypeArgumentCount { supplied, expected } => {
                write!(f, "expected {} type argument(s), got {}", expected, supplied)
            }
            RejectionCause::TypeArgumentBound {
                param,
                bound,
                found,
            } => write!(f, "type argument {} = {} violates bound {}", param, found, bound),
            RejectionCause::NoMatchingOverload(causes) => write!(
                f,
                "no overload matches [{}]",
                causes.iter().map(|c| c.to_string()).join("; ")
            ),
            RejectionCause::MissingProperty { property, receiver } => {
                write!(f, "property '{}' is missing in {}", property, receiver)
            }
            RejectionCause::NullableAccess { property, receiver } => {
                write!(f, "cannot access '{}' on possibly null {}", property, receiver)
            }
            RejectionCause::NonNumericOperand { left, right } => {
                write!(f, "cannot add {} and {}", left, right)
            }
            RejectionCause::IncompatibleAssignment {
                expected, found, ..
            } => write!(f, "{} is incompatible with {}", found, expected),
            RejectionCause::NotCallable(ty) => write!(f, "{} is not callable", ty),
            RejectionCause::NotAComponent(ty) => write!(f, "{} is not a React component", ty),
        }
    }
}

/// A classified rejection
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub cause: RejectionCause,
}

impl From<RejectionCause> for Diagnostic {
    fn from(cause: RejectionCause) -> Self {
        Diagnostic {
            kind: cause.kind(),
            cause,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arity(supplied: usize, min: usize, max: Option<usize>) -> RejectionCause {
        RejectionCause::ArityMismatch { supplied, min, max }
    }

    #[test]
    fn test_kind_codes_round_trip_through_from_str() {
        for kind in DiagnosticKind::ALL {
            assert_eq!(kind.code().parse::<DiagnosticKind>(), Ok(kind));
        }
        assert_eq!(
            "incompatible-everything".parse::<DiagnosticKind>(),
            Err(UnknownKind("incompatible-everything".to_string()))
        );
    }

    #[test]
    fn test_arity_classification() {
        assert_eq!(arity(2, 1, Some(1)).kind(), DiagnosticKind::ExtraArg);
        assert_eq!(arity(0, 1, Some(2)).kind(), DiagnosticKind::IncompatibleCall);
        assert_eq!(arity(0, 1, None).kind(), DiagnosticKind::IncompatibleCall);
    }

    #[test]
    fn test_overload_classification() {
        let all_extra = RejectionCause::NoMatchingOverload(vec![arity(3, 1, Some(1)), arity(3, 0, Some(2))]);
        assert_eq!(all_extra.kind(), DiagnosticKind::ExtraArg);

        let mixed = RejectionCause::NoMatchingOverload(vec![
            arity(3, 1, Some(1)),
            RejectionCause::IncompatibleArgument {
                position: 0,
                expected: TypeExpr::String,
                found: TypeExpr::Number,
            },
        ]);
        assert_eq!(mixed.kind(), DiagnosticKind::IncompatibleCall);
    }

    #[test]
    fn test_assignment_classification() {
        let plain = RejectionCause::IncompatibleAssignment {
            expected: TypeExpr::Number,
            found: TypeExpr::String,
            in_type_arg: false,
        };
        assert_eq!(plain.kind(), DiagnosticKind::IncompatibleType);

        let in_arg = RejectionCause::IncompatibleAssignment {
            expected: TypeExpr::Number,
            found: TypeExpr::String,
            in_type_arg: true,
        };
        assert_eq!(in_arg.kind(), DiagnosticKind::IncompatibleTypeArg);
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::from(RejectionCause::MissingProperty {
            property: "doesNotExist".to_string(),
            receiver: TypeExpr::Named("Thenable".to_string(), vec![]),
        });
        assert_eq!(d.to_string(), "[prop-missing] property 'doesNotExist' is missing in Thenable");
    }
}
