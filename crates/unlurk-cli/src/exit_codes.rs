//! Process exit codes.
//! Library failures map through `UnlurkError::exit_code`; anything else is an internal error.

use unlurk_core::UnlurkError;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_INTERNAL_ERROR: i32 = 2; // Failure outside the library (I/O, serialization)

/// Exit code for a failed command.
pub fn for_error(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<UnlurkError>()
        .map(UnlurkError::exit_code)
        .unwrap_or(EXIT_INTERNAL_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_library_errors_keep_their_code() {
        let err: anyhow::Result<()> = Err(UnlurkError::ParseFailed {
            message: "bad".into(),
        })
        .context("failed to resolve front page");
        assert_eq!(for_error(&err.unwrap_err()), 6);
    }

    #[test]
    fn test_other_errors_are_internal() {
        let err = anyhow::anyhow!("boom");
        assert_eq!(for_error(&err), EXIT_INTERNAL_ERROR);
    }
}
