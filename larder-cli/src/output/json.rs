//! JSON output formatting for machine-readable output.

use serde::Serialize;

/// JSON output formatter
pub struct JsonOutput;

impl JsonOutput {
    /// Pretty-print `data`. Serialization failures become an error object.
    pub fn format<T: Serialize + ?Sized>(data: &T) -> String {
        serde_json::to_string_pretty(data)
            .unwrap_or_else(|e| format!("{{\n  \"error\": \"{}\"\n}}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Hit {
        name: String,
        score: f32,
    }

    #[test]
    fn test_format_pretty() {
        let hit = Hit {
            name: "Pound cake".to_string(),
            score: 0.5,
        };
        let output = JsonOutput::format(&hit);
        assert!(output.contains('\n'));
        assert!(output.contains("\"name\": \"Pound cake\""));
        assert!(output.contains("\"score\": 0.5"));
    }
}
