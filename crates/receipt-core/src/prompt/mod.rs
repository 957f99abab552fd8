//! Instruction prompt template and per-document prompt composition.
//!
//! The prompt carries the output schema and the tax/invoice business rules.
//! Those rules are forwarded to the model verbatim and never evaluated here.

use std::path::Path;

use tracing::debug;

/// Built-in instruction prompt.
pub const DEFAULT_INSTRUCTION_PROMPT: &str = include_str!("default_prompt.txt");

/// File name attached to the reference list (account categories) file part.
pub const REFERENCE_FILE_NAME: &str = "kanjokamoku.txt";

/// Label preceding the document name in the composed prompt.
const TARGET_FILE_LABEL: &str = "処理対象ファイル名";

/// Closing reminder asking for a bare JSON array.
const PLAIN_JSON_REMINDER: &str =
    "【重要】出力はマークダウン記法を含まず、必ず純粋なJSON配列のテキストのみを返してください。";

/// Compose the text part sent with one document.
pub fn compose_instruction(prompt: &str, document_name: &str) -> String {
    format!(
        "{}\n{}: {}\n{}",
        prompt.trim_end(),
        TARGET_FILE_LABEL,
        document_name,
        PLAIN_JSON_REMINDER
    )
}

/// Load an edited instruction prompt, or the default when no path is given.
pub fn load_instruction(path: Option<&Path>) -> std::io::Result<String> {
    match path {
        Some(path) => {
            debug!("Loading instruction prompt from {}", path.display());
            let text = std::fs::read_to_string(path)?;
            if text.trim().is_empty() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("instruction prompt {} is empty", path.display()),
                ));
            }
            Ok(text)
        }
        None => Ok(DEFAULT_INSTRUCTION_PROMPT.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt_describes_schema() {
        for key in crate::models::record::FIELD_NAMES {
            assert!(
                DEFAULT_INSTRUCTION_PROMPT.contains(key),
                "default prompt is missing key {}",
                key
            );
        }
    }

    #[test]
    fn test_compose_appends_document_name() {
        let composed = compose_instruction("Extract receipts.\n\n", "scan_01.pdf");
        assert!(composed.starts_with("Extract receipts.\n"));
        assert!(composed.contains("処理対象ファイル名: scan_01.pdf"));
        assert!(composed.ends_with(PLAIN_JSON_REMINDER));
    }

    #[test]
    fn test_load_instruction_default_and_file() {
        assert_eq!(load_instruction(None).unwrap(), DEFAULT_INSTRUCTION_PROMPT);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.txt");
        std::fs::write(&path, "Only dates, please.").unwrap();
        assert_eq!(load_instruction(Some(&path)).unwrap(), "Only dates, please.");

        std::fs::write(&path, "  \n").unwrap();
        assert!(load_instruction(Some(&path)).is_err());
    }
}
