//! Result type alias for the toolkit

use super::errors::LmsError;

/// Result type alias for toolkit operations
///
/// # Examples
///
/// ```
/// use lms_toolkit::domain::result::Result;
/// use lms_toolkit::domain::errors::LmsError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(LmsError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, LmsError>;
