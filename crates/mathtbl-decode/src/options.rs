//! Validation policy and the diagnostics it produces.

use std::fmt;

use crate::cursor::{ByteSource, RelativeCursor};
use crate::error::{DecodeError, DecodeResult};

/// How structural assertion failures are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationPolicy {
    /// The first structural failure aborts the whole decode.
    Strict,
    /// A structural failure drops the sub-chunk or chunk it occurs in.
    #[default]
    Collect,
    /// Like `Collect`, but mismatches in low-risk fields are replaced by the
    /// expected value and the unit is kept.
    Lenient,
}

/// How much a mismatching field says about the rest of the structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Risk {
    /// Padding, marker bytes and constants whose value is never used to
    /// position later reads.
    Low,
    /// Values that decide layout; a mismatch means later reads are suspect.
    High,
}

/// Options controlling a decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    pub policy: ValidationPolicy,
}

impl DecodeOptions {
    #[must_use]
    pub fn strict() -> Self {
        Self {
            policy: ValidationPolicy::Strict,
        }
    }

    #[must_use]
    pub fn lenient() -> Self {
        Self {
            policy: ValidationPolicy::Lenient,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Whether an error should abort the whole decode rather than only the
    /// unit that raised it.
    #[must_use]
    pub fn escalates(&self, error: &DecodeError) -> bool {
        error.is_fatal()
            || (self.policy == ValidationPolicy::Strict
                && (error.aborts_chunk()
                    || matches!(error, DecodeError::StructuralAssertionFailure { .. })))
    }
}

/// A non-fatal problem found while decoding, with where it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Index of the chunk in the directory.
    pub chunk: Option<usize>,
    /// Slot index inside an environment chunk's sub-chunk table.
    pub sub_chunk: Option<usize>,
    /// Whether the offending unit was dropped from the result.
    pub dropped: bool,
    pub error: DecodeError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(chunk) = self.chunk {
            write!(f, "chunk {chunk}")?;
            if let Some(slot) = self.sub_chunk {
                write!(f, " sub-chunk {slot}")?;
            }
            write!(f, ": ")?;
        }
        write!(f, "{}", self.error)?;
        if self.dropped {
            write!(f, " (skipped)")?;
        }
        Ok(())
    }
}

/// Applies a `ValidationPolicy` to expected-constant checks.
///
/// Substitutions made under `Lenient` are kept as notes so the caller can
/// attach them to the unit they belong to.
#[derive(Debug)]
pub struct Validator {
    policy: ValidationPolicy,
    notes: Vec<DecodeError>,
}

impl Validator {
    #[must_use]
    pub fn new(options: &DecodeOptions) -> Self {
        Self {
            policy: options.policy,
            notes: Vec::new(),
        }
    }

    /// Compare `actual` with `expected`.
    ///
    /// Returns the value decoding should continue with: `actual` when they
    /// agree, `expected` when a low-risk mismatch was substituted.
    pub fn check(
        &mut self,
        field: &'static str,
        expected: u64,
        actual: u64,
        position: u64,
        risk: Risk,
    ) -> DecodeResult<u64> {
        if expected == actual {
            return Ok(actual);
        }
        let error = DecodeError::StructuralAssertionFailure {
            field,
            expected,
            actual,
            position,
        };
        if risk == Risk::Low && self.policy == ValidationPolicy::Lenient {
            tracing::warn!(field, expected, actual, position, "substituting expected value");
            self.notes.push(error);
            return Ok(expected);
        }
        Err(error)
    }

    pub fn expect_u8<R: ByteSource>(
        &mut self,
        cursor: &mut RelativeCursor<R>,
        field: &'static str,
        expected: u8,
        risk: Risk,
    ) -> DecodeResult<u8> {
        let position = cursor.position();
        let actual = cursor.read_u8()?;
        self.check(field, expected.into(), actual.into(), position, risk)?;
        Ok(expected)
    }

    pub fn expect_u16<R: ByteSource>(
        &mut self,
        cursor: &mut RelativeCursor<R>,
        field: &'static str,
        expected: u16,
        risk: Risk,
    ) -> DecodeResult<u16> {
        let position = cursor.position();
        let actual = cursor.read_u16()?;
        self.check(field, expected.into(), actual.into(), position, risk)?;
        Ok(expected)
    }

    pub fn expect_u32<R: ByteSource>(
        &mut self,
        cursor: &mut RelativeCursor<R>,
        field: &'static str,
        expected: u32,
        risk: Risk,
    ) -> DecodeResult<u32> {
        let position = cursor.position();
        let actual = cursor.read_u32()?;
        self.check(field, expected.into(), actual.into(), position, risk)?;
        Ok(expected)
    }

    /// Expect `count` consecutive zero words.
    pub fn expect_zero_words<R: ByteSource>(
        &mut self,
        cursor: &mut RelativeCursor<R>,
        field: &'static str,
        count: usize,
    ) -> DecodeResult<()> {
        for _ in 0..count {
            self.expect_u32(cursor, field, 0, Risk::Low)?;
        }
        Ok(())
    }

    /// Take the notes gathered since the last call.
    pub fn take_notes(&mut self) -> Vec<DecodeError> {
        std::mem::take(&mut self.notes)
    }
}
