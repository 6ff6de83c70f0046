//! Transpose header extraction.

use super::colorize::TRANSPOSE_PREFIX;

/// Collects the value of every `Transpose by: <n>` header in the sheet.
///
/// Used in multi-transpose mode, where the backend emits one section per
/// transposition and the player needs the list of shifts. Headers whose
/// value does not parse are skipped.
pub fn extract_transposes(text: &str) -> Vec<i32> {
    text.lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix(TRANSPOSE_PREFIX)?;
            let token = rest.split_whitespace().next()?;
            token.parse::<i32>().ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_transposes() {
        let text = "Transpose by: +2\n\nabc\nTranspose by: -3\n\ndef\n  Transpose by: 0";
        assert_eq!(extract_transposes(text), vec![2, -3, 0]);
    }

    #[test]
    fn test_extract_skips_malformed() {
        assert!(extract_transposes("Transpose by: up\nTranspose by:").is_empty());
        assert!(extract_transposes("").is_empty());
    }
}
