use clap::ValueEnum;

/// Output format of one-shot reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
    Tsv,
}

impl OutputFormat {
    /// Returns the delimiter for CSV/TSV formats
    pub fn delimiter(&self) -> Option<&'static str> {
        match self {
            Self::Csv => Some(","),
            Self::Tsv => Some("\t"),
            _ => None,
        }
    }
}

/// Escape a field for CSV output (handles commas, quotes, newlines)
pub fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Escape a field for TSV output (replaces tabs and newlines)
pub fn tsv_escape(field: &str) -> String {
    field
        .replace('\t', "\\t")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// Format fields as a delimited row (CSV or TSV)
pub fn format_delimited_row(format: OutputFormat, fields: &[&str]) -> String {
    let escaped: Vec<String> = match format {
        OutputFormat::Csv => fields.iter().map(|f| csv_escape(f)).collect(),
        OutputFormat::Tsv => fields.iter().map(|f| tsv_escape(f)).collect(),
        _ => fields.iter().map(|s| s.to_string()).collect(),
    };
    let delimiter = format.delimiter().unwrap_or(",");
    escaped.join(delimiter)
}

/// Humanize a byte count
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}
