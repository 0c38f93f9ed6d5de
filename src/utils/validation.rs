//! Centralized input limits and validation helpers.

/// Maximum number of sequences accepted from a single file (DOS protection)
pub const MAX_SEQUENCES: usize = 100_000;

/// Maximum total length of the target sequences scanned for guides
pub const MAX_TARGET_LENGTH: usize = 50_000_000;

/// Maximum size of raw (non-FASTA) sequence text read into memory
pub const MAX_RAW_TEXT_BYTES: usize = 256 * 1024 * 1024;

/// Input validation error types
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Input is empty")]
    EmptyInput,
    #[error("Input appears to be binary, not sequence text")]
    BinaryContent,
    #[error("Input of {0} bytes exceeds the maximum of {MAX_RAW_TEXT_BYTES}")]
    TooLarge(usize),
    #[error("Targets total {0} bp, exceeding the maximum of {MAX_TARGET_LENGTH}")]
    TargetTooLong(usize),
    #[error("Percentage {0} must be between 0 and 100")]
    InvalidPercentage(f64),
}

/// Check if adding another sequence would exceed the maximum allowed.
///
/// Call this with the current count BEFORE adding a new sequence.
/// Returns an error message if adding would exceed the limit, None if safe to add.
///
/// # Example
/// ```ignore
/// if check_sequence_limit(sequences.len()).is_some() {
///     return Err(...);
/// }
/// sequences.push(new_sequence); // Safe to add
/// ```
#[must_use]
pub fn check_sequence_limit(count: usize) -> Option<String> {
    if count >= MAX_SEQUENCES {
        Some(format!(
            "Too many sequences: adding another would exceed maximum of {MAX_SEQUENCES}"
        ))
    } else {
        None
    }
}

/// Validate the combined length of design targets.
///
/// # Errors
///
/// Returns `ValidationError::TargetTooLong` above [`MAX_TARGET_LENGTH`].
pub fn check_target_length(total: usize) -> Result<(), ValidationError> {
    if total > MAX_TARGET_LENGTH {
        return Err(ValidationError::TargetTooLong(total));
    }
    Ok(())
}

/// Check that raw input looks like text before treating it as a sequence.
///
/// # Errors
///
/// Returns `ValidationError::EmptyInput`, `TooLarge`, or `BinaryContent`.
pub fn validate_text_content(content: &[u8]) -> Result<(), ValidationError> {
    if content.iter().all(u8::is_ascii_whitespace) {
        return Err(ValidationError::EmptyInput);
    }
    if content.len() > MAX_RAW_TEXT_BYTES {
        return Err(ValidationError::TooLarge(content.len()));
    }

    // Null bytes or a high share of control characters mean binary data
    let sample = &content[..content.len().min(8192)];
    let control = sample
        .iter()
        .filter(|&&b| b == 0 || (b < 0x20 && !b.is_ascii_whitespace()))
        .count();
    if sample.contains(&0) || control * 20 > sample.len() {
        return Err(ValidationError::BinaryContent);
    }

    Ok(())
}

/// Convert a GC bound given on the command line to a fraction.
///
/// Values of 1 or more are read as percentages (`40` -> 0.40, `1` -> 0.01);
/// values below 1 are taken as fractions already.
///
/// # Errors
///
/// Returns `ValidationError::InvalidPercentage` outside [0, 100].
pub fn gc_bound_to_fraction(value: f64) -> Result<f64, ValidationError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(ValidationError::InvalidPercentage(value));
    }
    Ok(if value >= 1.0 { value / 100.0 } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_sequence_limit() {
        assert!(check_sequence_limit(0).is_none());
        assert!(check_sequence_limit(MAX_SEQUENCES - 1).is_none());
        assert!(check_sequence_limit(MAX_SEQUENCES).is_some());
    }

    #[test]
    fn test_check_target_length() {
        assert!(check_target_length(1_000).is_ok());
        assert!(matches!(
            check_target_length(MAX_TARGET_LENGTH + 1),
            Err(ValidationError::TargetTooLong(_))
        ));
    }

    #[test]
    fn test_validate_text_content() {
        assert!(validate_text_content(b"ACGTACGT\n").is_ok());
        assert!(matches!(
            validate_text_content(b"  \n"),
            Err(ValidationError::EmptyInput)
        ));
        assert!(matches!(
            validate_text_content(b"ACGT\0\x01\x02"),
            Err(ValidationError::BinaryContent)
        ));
    }

    #[test]
    fn test_gc_bound_to_fraction() {
        assert!((gc_bound_to_fraction(40.0).unwrap() - 0.40).abs() < 1e-12);
        assert!((gc_bound_to_fraction(0.55).unwrap() - 0.55).abs() < 1e-12);
        assert!((gc_bound_to_fraction(1.0).unwrap() - 0.01).abs() < 1e-12);
        assert!((gc_bound_to_fraction(100.0).unwrap() - 1.0).abs() < 1e-12);
        assert!(gc_bound_to_fraction(f64::NAN).is_err());
        assert!(gc_bound_to_fraction(120.0).is_err());
        assert!(gc_bound_to_fraction(-1.0).is_err());
    }
}
