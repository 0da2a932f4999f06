use serde::{Deserialize, Serialize};

/// Static-analysis results fed to the task generator. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub todos: Vec<TodoFinding>,
    pub coverage: Option<CoverageReport>,
    pub quality: Option<QualityReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoFinding {
    pub file: String,
    pub line: u32,
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    #[serde(default)]
    pub low_coverage: Vec<LowCoverageFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowCoverageFile {
    #[serde(alias = "path")]
    pub file: String,
    pub coverage: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityReport {
    #[serde(default)]
    pub issues: Vec<QualityIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityIssue {
    pub file: String,
    pub line: Option<u32>,
    #[serde(rename = "type")]
    pub issue_type: String,
    pub message: String,
    pub severity: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_analysis() {
        let json = serde_json::json!({
            "todos": [{"file": "src/lib.rs", "line": 12, "text": "handle empty input"}],
            "coverage": {"lowCoverage": [{"path": "src/db.rs", "coverage": 41.5}]},
            "quality": {"issues": [{
                "file": "src/main.rs", "line": 3, "type": "complexity",
                "message": "function too long", "severity": "high"
            }]}
        });
        let analysis: Analysis = serde_json::from_value(json).unwrap();
        assert_eq!(analysis.todos.len(), 1);
        assert_eq!(analysis.coverage.unwrap().low_coverage[0].file, "src/db.rs");
        assert_eq!(analysis.quality.unwrap().issues[0].issue_type, "complexity");
    }

    #[test]
    fn test_parse_empty_analysis() {
        let analysis: Analysis = serde_json::from_str("{}").unwrap();
        assert!(analysis.todos.is_empty());
        assert!(analysis.coverage.is_none());
        assert!(analysis.quality.is_none());
    }
}
