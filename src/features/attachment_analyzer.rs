use super::FeatureExtractor;
use crate::mail::{Attachment, EmailData};
use crate::signal::{Severity, Signal, SignalCategory};

const DANGEROUS_TYPES: &[&str] = &[
    "application/x-msdownload",
    "application/x-msdos-program",
    "application/x-executable",
    "application/x-sh",
    "application/x-javascript",
    "application/javascript",
    "application/x-bat",
    "application/x-msi",
    "application/vnd.ms-cab-compressed",
];

const DANGEROUS_EXTENSIONS: &[&str] = &[
    ".exe", ".scr", ".bat", ".cmd", ".com", ".pif", ".vbs", ".vbe", ".js", ".jse", ".ws", ".wsf",
    ".msi", ".msp", ".hta", ".cpl", ".ps1", ".reg", ".dll",
];

const MACRO_EXTENSIONS: &[&str] = &[".docm", ".xlsm", ".pptm"];

// Macro-capable office formats are counted here too.
const RISKY_EXTENSIONS: &[&str] = &[
    ".doc", ".docm", ".xls", ".xlsm", ".ppt", ".pptm", ".zip", ".rar", ".7z", ".tar", ".gz",
    ".iso", ".img",
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentCounts {
    pub dangerous: usize,
    pub macro_enabled: usize,
    pub risky: usize,
}

pub struct AttachmentAnalyzer;

impl Default for AttachmentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl AttachmentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// `invoice.pdf.exe` has a final extension of `.exe` behind a decoy one.
    fn double_extension_tail(name: &str) -> Option<String> {
        let parts: Vec<&str> = name.split('.').collect();
        if parts.len() < 3 {
            return None;
        }
        let is_word = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_');
        let last = parts[parts.len() - 1];
        let decoy = parts[parts.len() - 2];
        if is_word(last) && is_word(decoy) {
            Some(format!(".{}", last))
        } else {
            None
        }
    }

    pub fn count(&self, attachments: &[Attachment]) -> AttachmentCounts {
        let mut counts = AttachmentCounts::default();

        for attachment in attachments {
            let name = attachment.name.to_lowercase();
            let content_type = attachment.content_type.to_lowercase();

            if DANGEROUS_TYPES.contains(&content_type.as_str()) {
                counts.dangerous += 1;
            }
            counts.dangerous += DANGEROUS_EXTENSIONS
                .iter()
                .filter(|ext| name.ends_with(*ext))
                .count();
            counts.risky += RISKY_EXTENSIONS
                .iter()
                .filter(|ext| name.ends_with(*ext))
                .count();
            if MACRO_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
                counts.macro_enabled += 1;
            }
            if let Some(tail) = Self::double_extension_tail(&name) {
                if DANGEROUS_EXTENSIONS.contains(&tail.as_str()) {
                    counts.dangerous += 1;
                }
            }
        }

        counts
    }

    pub fn analyze(&self, attachments: &[Attachment]) -> Vec<Signal> {
        let mut signals = Vec::new();
        if attachments.is_empty() {
            return signals;
        }

        let counts = self.count(attachments);

        if counts.dangerous > 0 {
            signals.push(Signal::new(
                SignalCategory::Attachment,
                "Dangerous Attachments",
                format!(
                    "{} potentially dangerous file(s) attached",
                    counts.dangerous
                ),
                35,
                Severity::High,
            ));
        }

        if counts.macro_enabled > 0 {
            signals.push(Signal::new(
                SignalCategory::Attachment,
                "Macro-Enabled Documents",
                format!(
                    "{} macro-enabled Office document(s) attached",
                    counts.macro_enabled
                ),
                25,
                Severity::High,
            ));
        }

        if counts.risky > 0 && counts.dangerous == 0 && counts.macro_enabled == 0 {
            signals.push(Signal::new(
                SignalCategory::Attachment,
                "Risky Attachments",
                format!(
                    "{} attachment(s) that could contain hidden content",
                    counts.risky
                ),
                10,
                Severity::Low,
            ));
        }

        signals
    }
}

impl FeatureExtractor for AttachmentAnalyzer {
    fn extract(&self, email: &EmailData) -> Vec<Signal> {
        self.analyze(&email.attachments)
    }

    fn name(&self) -> &str {
        "Attachment Analysis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(name: &str, content_type: &str) -> Attachment {
        Attachment {
            name: name.to_string(),
            content_type: content_type.to_string(),
            size: 100,
        }
    }

    #[test]
    fn test_double_extension_counts_as_dangerous() {
        let analyzer = AttachmentAnalyzer::new();
        let counts = analyzer.count(&[attachment("invoice.pdf.exe", "application/pdf")]);
        assert!(counts.dangerous >= 1);

        let signals = analyzer.analyze(&[attachment("Invoice.PDF.EXE", "")]);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].name(), "Dangerous Attachments");
        assert_eq!(signals[0].score(), 35);
    }

    #[test]
    fn test_dangerous_mime_type() {
        let counts = AttachmentAnalyzer::new()
            .count(&[attachment("readme", "Application/X-MSDownload")]);
        assert_eq!(counts.dangerous, 1);
    }

    #[test]
    fn test_macro_document_suppresses_risky() {
        let signals = AttachmentAnalyzer::new().analyze(&[attachment(
            "Q3-report.xlsm",
            "application/vnd.ms-excel.sheet.macroenabled.12",
        )]);

        let names: Vec<&str> = signals.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["Macro-Enabled Documents"]);
        assert_eq!(signals[0].score(), 25);
    }

    #[test]
    fn test_risky_only_when_nothing_worse() {
        let analyzer = AttachmentAnalyzer::new();

        let archive_only = analyzer.analyze(&[attachment("photos.zip", "application/zip")]);
        assert_eq!(archive_only.len(), 1);
        assert_eq!(archive_only[0].name(), "Risky Attachments");
        assert_eq!(archive_only[0].score(), 10);

        let mixed = analyzer.analyze(&[
            attachment("photos.zip", "application/zip"),
            attachment("setup.msi", "application/x-msi"),
        ]);
        assert!(mixed.iter().all(|s| s.name() != "Risky Attachments"));
    }

    #[test]
    fn test_plain_attachments() {
        let analyzer = AttachmentAnalyzer::new();
        assert!(analyzer.analyze(&[]).is_empty());
        assert!(analyzer
            .analyze(&[attachment("notes.pdf", "application/pdf")])
            .is_empty());
    }
}
