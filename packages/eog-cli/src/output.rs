use std::io::Write;
use std::path::Path;

/// Write `text` plus a trailing newline to `output_path`, or to stdout.
pub fn write_output(text: &str, output_path: Option<&str>) -> Result<(), String> {
    match output_path {
        Some(path) => std::fs::write(Path::new(path), format!("{}\n", text))
            .map_err(|e| format!("Failed to write output file '{}': {}", path, e)),
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{}", text).map_err(|e| format!("Failed to write to stdout: {}", e))
        }
    }
}

/// Serialize a value to JSON (pretty or compact).
pub fn to_json<T: serde::Serialize>(value: &T, compact: bool) -> Result<String, String> {
    let json = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    json.map_err(|e| format!("JSON serialization failed: {}", e))
}

/// Serialize and write in one step.
pub fn emit_json<T: serde::Serialize>(value: &T, compact: bool, output_path: Option<&str>) -> Result<(), String> {
    write_output(&to_json(value, compact)?, output_path)
}

/// One value per line.
pub fn to_lines<T: std::fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_json_compact_and_pretty() {
        let value = serde_json::json!({"a": [1, 2]});
        assert_eq!(to_json(&value, true).unwrap(), r#"{"a":[1,2]}"#);
        assert!(to_json(&value, false).unwrap().contains('\n'));
    }

    #[test]
    fn test_to_lines() {
        assert_eq!(to_lines(&[1u16, 2, 3]), "1\n2\n3");
        assert_eq!(to_lines::<f64>(&[]), "");
    }

    #[test]
    fn test_write_output_to_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.json");
        write_output("{}", path.to_str()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}\n");
    }
}
